//! Configuration management for robolog.
//!
//! Loads settings from /etc/robolog/config.toml or uses defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/robolog/config.toml";

/// A robot the classroom tracks. Checklist files are looked up by `key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotInfo {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobologConfig {
    /// Address the HTTP API binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding per-robot checklist YAML files
    #[serde(default = "default_checklist_dir")]
    pub checklist_dir: PathBuf,

    /// Static PIN required on admin endpoints. Empty disables the admin API.
    #[serde(default)]
    pub admin_pin: String,

    /// Robots offered to the class
    #[serde(default = "default_robots")]
    pub robots: Vec<RobotInfo>,
}

fn default_listen_addr() -> String {
    // Localhost only; the classroom reverse-proxy terminates the LAN side
    "127.0.0.1:7878".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/var/lib/robolog/robolog.db")
}

fn default_checklist_dir() -> PathBuf {
    PathBuf::from("/etc/robolog/checklists")
}

fn default_robots() -> Vec<RobotInfo> {
    vec![
        RobotInfo {
            key: "rvr_plus".to_string(),
            name: "RVR+ Sphero".to_string(),
        },
        RobotInfo {
            key: "cutebot_pro".to_string(),
            name: "Cutebot Pro (Micro:Bit)".to_string(),
        },
        RobotInfo {
            key: "picarx".to_string(),
            name: "PiCar-X (Raspberry Pi 5)".to_string(),
        },
    ]
}

impl Default for RobologConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            checklist_dir: default_checklist_dir(),
            admin_pin: String::new(),
            robots: default_robots(),
        }
    }
}

impl RobologConfig {
    /// Load configuration from `path` (or [`CONFIG_PATH`] when `None`).
    ///
    /// A missing or unparsable file falls back to defaults with a warning so
    /// the daemon still comes up.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Invalid config at {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                warn!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

}
