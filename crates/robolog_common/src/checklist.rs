//! Checklist definitions.
//!
//! A checklist describes what a student can tick off for one robot: an
//! ordered list of levels, each an ordered list of items. Definitions are
//! plain YAML files, one per robot, deserialized straight into these types.
//! The XP engine only needs the level-membership view of this data.

use crate::error::RobologError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistLevel {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub robot: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub levels: Vec<ChecklistLevel>,
}

impl Checklist {
    pub fn level(&self, level_key: &str) -> Option<&ChecklistLevel> {
        self.levels.iter().find(|l| l.key == level_key)
    }

    /// The level an item belongs to, if any.
    pub fn level_of(&self, item_key: &str) -> Option<&str> {
        self.levels
            .iter()
            .find(|l| l.items.iter().any(|it| it.key == item_key))
            .map(|l| l.key.as_str())
    }

    pub fn item_count(&self) -> usize {
        self.levels.iter().map(|l| l.items.len()).sum()
    }
}

/// All loaded checklists, keyed by robot.
#[derive(Debug, Clone, Default)]
pub struct ChecklistSet {
    checklists: HashMap<String, Checklist>,
}

impl ChecklistSet {
    /// Load every `*.yml` / `*.yaml` file in `dir`.
    ///
    /// A missing directory or an unreadable file is logged and skipped: a
    /// robot without a checklist simply earns no level XP, it must never
    /// keep the daemon from starting.
    pub fn load_dir(dir: &Path) -> Result<Self, RobologError> {
        let mut checklists = HashMap::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Checklist directory {} not readable: {}", dir.display(), e);
                return Ok(Self::default());
            }
        };
        for entry in entries {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }
            match Self::load_file(&path) {
                Ok(checklist) => {
                    info!(
                        "Loaded checklist for {} ({} levels, {} items)",
                        checklist.robot,
                        checklist.levels.len(),
                        checklist.item_count()
                    );
                    checklists.insert(checklist.robot.clone(), checklist);
                }
                Err(e) => error!("Skipping checklist {}: {}", path.display(), e),
            }
        }
        Ok(Self { checklists })
    }

    fn load_file(path: &Path) -> Result<Checklist, RobologError> {
        let raw = std::fs::read_to_string(path)?;
        let checklist: Checklist = serde_yaml::from_str(&raw)?;
        if checklist.robot.is_empty() {
            return Err(RobologError::Checklist(format!(
                "{}: missing robot key",
                path.display()
            )));
        }
        Ok(checklist)
    }

    /// Build a set from already-constructed checklists (tests).
    pub fn from_checklists(checklists: Vec<Checklist>) -> Self {
        Self {
            checklists: checklists
                .into_iter()
                .map(|c| (c.robot.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, robot_key: &str) -> Option<&Checklist> {
        self.checklists.get(robot_key)
    }

    pub fn len(&self) -> usize {
        self.checklists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checklists.is_empty()
    }
}
