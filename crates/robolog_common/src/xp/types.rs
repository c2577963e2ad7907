//! Shared XP types: event kinds, rules and the stats response shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a ledger row granted XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpEventKind {
    ItemComplete,
    LevelComplete,
    MasteryTier,
    TeacherAward,
    ReflectionBonus,
}

impl XpEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            XpEventKind::ItemComplete => "item_complete",
            XpEventKind::LevelComplete => "level_complete",
            XpEventKind::MasteryTier => "mastery_tier",
            XpEventKind::TeacherAward => "teacher_award",
            XpEventKind::ReflectionBonus => "reflection_bonus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item_complete" => Some(XpEventKind::ItemComplete),
            "level_complete" => Some(XpEventKind::LevelComplete),
            "mastery_tier" => Some(XpEventKind::MasteryTier),
            "teacher_award" => Some(XpEventKind::TeacherAward),
            "reflection_bonus" => Some(XpEventKind::ReflectionBonus),
            _ => None,
        }
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpEvent {
    pub id: i64,
    pub student_id: String,
    pub robot_key: String,
    pub level_key: Option<String>,
    pub item_key: Option<String>,
    pub kind: XpEventKind,
    pub delta: i64,
    pub tier: Option<i64>,
    pub meta: Option<String>,
    pub occurred_at: String,
}

/// A milestone bonus unlocked once `threshold_items` items are done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryTier {
    pub threshold_items: i64,
    pub bonus_xp: i64,
    pub badge_key: String,
}

/// Scoring configuration for one robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpRules {
    pub base_item_xp: i64,
    pub level_complete_xp: i64,
    /// Strictly increasing thresholds, walked in order by the engine.
    pub mastery_tiers: Vec<MasteryTier>,
    /// Cumulative XP at which each level starts; index 0 is level 1 at 0.
    pub level_curve: Vec<i64>,
}

impl XpRules {
    /// Highest tier number (1-based) whose threshold is within `items_done`,
    /// 0 when none is. Resets re-derive the mastery tier through this.
    pub fn tier_for_count(&self, items_done: i64) -> i64 {
        let mut tier = 0;
        for (idx, t) in self.mastery_tiers.iter().enumerate() {
            if items_done >= t.threshold_items {
                tier = (idx + 1) as i64;
            }
        }
        tier
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentXpStats {
    pub total_xp: i64,
    pub level: i64,
    pub xp_in_level: i64,
    pub next_level_xp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotXpStats {
    pub robot_xp: i64,
    pub items_done: i64,
    pub levels_complete: i64,
    pub mastery_tier: i64,
}

/// What `get_stats` hands the UI: the student's global standing plus a
/// per-robot breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpStatsResponse {
    pub student: StudentXpStats,
    pub robots: BTreeMap<String, RobotXpStats>,
}
