//! Scoring rules and the level curve resolver.
//!
//! Rules are pure configuration: given a robot key they are deterministic
//! and involve no storage. Today every robot shares one rule set, but the
//! lookup stays keyed so per-robot tuning needs no call-site changes.

use crate::xp::types::{MasteryTier, XpRules};

/// The shared rule set.
pub fn default_rules() -> XpRules {
    XpRules {
        base_item_xp: 10,
        level_complete_xp: 25,
        mastery_tiers: vec![
            MasteryTier {
                threshold_items: 10,
                bonus_xp: 30,
                badge_key: "mastery_t1".to_string(),
            },
            MasteryTier {
                threshold_items: 20,
                bonus_xp: 50,
                badge_key: "mastery_t2".to_string(),
            },
            MasteryTier {
                threshold_items: 35,
                bonus_xp: 75,
                badge_key: "mastery_t3".to_string(),
            },
            // "all items" stands in as a very high threshold
            MasteryTier {
                threshold_items: 999_999,
                bonus_xp: 100,
                badge_key: "mastery_t4".to_string(),
            },
        ],
        // gentle curve; entries are the cumulative XP where each level starts
        level_curve: vec![0, 50, 120, 210, 320, 450, 600, 770, 960, 1170, 1400],
    }
}

/// Rules for one robot. Currently identical for all robots.
pub fn rules_for_robot(_robot_key: &str) -> XpRules {
    default_rules()
}

/// Where a cumulative XP total lands on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: i64,
    pub xp_in_level: i64,
    /// XP span of the current level; 0 past the last configured threshold.
    pub xp_to_next: i64,
}

/// Map a cumulative total onto the curve.
///
/// `level` is the largest `i + 1` with `curve[i] <= total`, so level 1 is
/// the floor even for negative totals (callers never construct those; the
/// raw difference is reported as-is).
pub fn resolve_level(total: i64, curve: &[i64]) -> LevelProgress {
    let mut level = 1usize;
    for (i, threshold) in curve.iter().enumerate() {
        if total >= *threshold {
            level = i + 1;
        }
    }
    let current_start = curve.get(level - 1).copied().unwrap_or(0);
    let next_start = curve.get(level).copied().unwrap_or(current_start);
    LevelProgress {
        level: level as i64,
        xp_in_level: total - current_start,
        xp_to_next: (next_start - current_start).max(0),
    }
}
