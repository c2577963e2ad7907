//! The XP subsystem: ledger, engine, stats and administrative operations.
//!
//! XP is a derived gamification layer over checklist progress. The ledger
//! (`xp_events`) is the source of truth; the two stats tables are caches
//! that every operation here keeps consistent inside one transaction.

pub mod award;
pub mod engine;
pub mod reset;
pub mod rules;
pub mod stats;
pub mod types;

pub use engine::{ProgressDelta, StatusChange};
pub use reset::XpResetScope;
pub use rules::{default_rules, resolve_level, rules_for_robot, LevelProgress};
pub use types::{
    MasteryTier, RobotXpStats, StudentXpStats, XpEvent, XpEventKind, XpRules, XpStatsResponse,
};
