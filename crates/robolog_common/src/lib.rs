//! Robolog Common - shared types and storage for the robolog tracker.
//!
//! Everything that both the daemon and the CLI need lives here: the SQLite
//! database with its schema, the checklist model, the student/progress/lock
//! stores and the XP subsystem (ledger, engine, stats, resets).

pub mod checklist;
pub mod config;
pub mod db;
pub mod error;
pub mod locks;
pub mod progress;
pub mod students;
pub mod xp;

pub use checklist::{Checklist, ChecklistItem, ChecklistLevel, ChecklistSet};
pub use config::{RobologConfig, RobotInfo};
pub use db::Database;
pub use error::RobologError;
pub use progress::ItemStatus;
pub use students::Student;
