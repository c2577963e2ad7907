//! Robolog Daemon - classroom progress tracker backend.
//!
//! Serves the checklist/progress/XP API the classroom UI and robologctl
//! talk to. All state lives in one SQLite database.

use anyhow::{Context, Result};
use robolog_common::{ChecklistSet, Database, RobologConfig};
use robologd::server::{self, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("robologd v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("ROBOLOG_CONFIG").ok().map(PathBuf::from);
    let config = RobologConfig::load(config_path.as_deref());

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    let checklists = ChecklistSet::load_dir(&config.checklist_dir)?;
    info!(
        "Loaded {} checklist(s) from {}",
        checklists.len(),
        config.checklist_dir.display()
    );
    if config.admin_pin.is_empty() {
        info!("No admin PIN configured - admin endpoints are disabled");
    }

    server::run(AppState::new(db, checklists, config)).await
}
