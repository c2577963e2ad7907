//! The XP engine.
//!
//! `apply_progress_delta` turns a batch of item-status transitions into
//! ledger rows and aggregate updates, all inside one transaction. Grants
//! are idempotent: every insert is `INSERT OR IGNORE` against the partial
//! unique indexes on `xp_events`, and only rows that actually landed count
//! toward the XP earned by this invocation. Two concurrent calls racing on
//! the same item therefore credit it exactly once - the loser sees zero
//! rows affected and moves on.
//!
//! Invariants kept here:
//! - `robot_xp_total` is only ever increased store-side (`current + delta`),
//!   never written as a client-computed absolute value;
//! - `items_done_count` is overwritten with a fresh count, never
//!   incremented, so it self-heals from any earlier partial failure;
//! - mastery tiers are granted in ascending order with no gaps, and the
//!   persisted tier advances after every single grant.

use crate::checklist::Checklist;
use crate::db::Database;
use crate::error::RobologError;
use crate::progress::{self, ItemStatus};
use crate::xp::rules::rules_for_robot;
use crate::xp::stats;
use crate::xp::types::XpEventKind;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, BTreeSet};

/// One item's transition as recorded by the progress store.
#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub prev: Option<ItemStatus>,
    pub next: ItemStatus,
}

impl StatusChange {
    /// The only transition that earns XP.
    fn newly_done(&self) -> bool {
        self.prev != Some(ItemStatus::Done) && self.next == ItemStatus::Done
    }
}

/// Batch of transitions from one progress write, keyed by item.
pub type ProgressDelta = BTreeMap<String, StatusChange>;

/// Whether an idempotent insert actually landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Append a ledger row, absorbing duplicates.
///
/// For the three uniqueness-guarded kinds a duplicate reports
/// `AlreadyExists`; kinds without an index (teacher awards) always insert.
pub(crate) fn insert_event(
    conn: &Connection,
    student_id: &str,
    robot_key: &str,
    kind: XpEventKind,
    delta: i64,
    level_key: Option<&str>,
    item_key: Option<&str>,
    tier: Option<i64>,
    meta: Option<&str>,
) -> Result<InsertOutcome, RobologError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO xp_events
             (student_id, robot_key, level_key, item_key, kind, delta, tier, meta, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            student_id,
            robot_key,
            level_key,
            item_key,
            kind.as_str(),
            delta,
            tier,
            meta,
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(if inserted == 0 {
        InsertOutcome::AlreadyExists
    } else {
        InsertOutcome::Inserted
    })
}

impl Database {
    /// Score a batch of checklist-item transitions for one student+robot.
    ///
    /// `checklist` may be `None` when no definition exists for the robot;
    /// items then still earn base XP (with no level attribution) but no
    /// level-completion checks run. A delta with nothing newly done is a
    /// no-op. On any error the transaction rolls back in full; callers on
    /// the progress-write path log and swallow the error so students never
    /// lose checklist progress to a scoring failure.
    pub fn apply_progress_delta(
        &self,
        checklist: Option<&Checklist>,
        robot_key: &str,
        student_id: &str,
        delta: &ProgressDelta,
    ) -> Result<(), RobologError> {
        let rules = rules_for_robot(robot_key);

        let newly_done: Vec<&str> = delta
            .iter()
            .filter(|(_, change)| change.newly_done())
            .map(|(item_key, _)| item_key.as_str())
            .collect();
        if newly_done.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut earned: i64 = 0;

        // Base XP per newly completed item
        for &item_key in &newly_done {
            let level_key = checklist.and_then(|c| c.level_of(item_key));
            let outcome = insert_event(
                &tx,
                student_id,
                robot_key,
                XpEventKind::ItemComplete,
                rules.base_item_xp,
                level_key,
                Some(item_key),
                None,
                None,
            )?;
            if outcome == InsertOutcome::Inserted {
                earned += rules.base_item_xp;
            }
        }

        // Level completion for every level the batch touched
        let mut new_levels: i64 = 0;
        if let Some(checklist) = checklist {
            let touched: BTreeSet<&str> = newly_done
                .iter()
                .filter_map(|&item_key| checklist.level_of(item_key))
                .collect();
            for level_key in touched {
                let Some(level) = checklist.level(level_key) else {
                    continue;
                };
                // a level with no items is never "complete"
                if level.items.is_empty() {
                    continue;
                }
                let item_keys: Vec<&str> =
                    level.items.iter().map(|it| it.key.as_str()).collect();
                let statuses =
                    progress::item_statuses_conn(&tx, student_id, robot_key, &item_keys)?;
                let all_done = item_keys
                    .iter()
                    .all(|key| statuses.get(*key) == Some(&ItemStatus::Done));
                if all_done {
                    let outcome = insert_event(
                        &tx,
                        student_id,
                        robot_key,
                        XpEventKind::LevelComplete,
                        rules.level_complete_xp,
                        Some(level_key),
                        None,
                        None,
                        None,
                    )?;
                    if outcome == InsertOutcome::Inserted {
                        earned += rules.level_complete_xp;
                        new_levels += 1;
                    }
                }
            }
        }

        // Authoritative recount; never an increment
        let items_done = progress::count_done_items_conn(&tx, student_id, robot_key)?;

        tx.execute(
            "INSERT INTO student_robot_stats
                 (student_id, robot_key, robot_xp_total, items_done_count,
                  levels_complete_count, mastery_tier)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)
             ON CONFLICT(student_id, robot_key) DO UPDATE SET
                 robot_xp_total = robot_xp_total + excluded.robot_xp_total,
                 items_done_count = excluded.items_done_count,
                 levels_complete_count = levels_complete_count + excluded.levels_complete_count",
            params![student_id, robot_key, earned, items_done, new_levels],
        )?;

        // Mastery walk: ascending, no tier skipped, persisted per grant
        let mut current_tier: i64 = tx.query_row(
            "SELECT mastery_tier FROM student_robot_stats
             WHERE student_id = ?1 AND robot_key = ?2",
            params![student_id, robot_key],
            |row| row.get(0),
        )?;
        for (idx, tier) in rules.mastery_tiers.iter().enumerate() {
            let tier_num = (idx + 1) as i64;
            if items_done >= tier.threshold_items && tier_num > current_tier {
                let outcome = insert_event(
                    &tx,
                    student_id,
                    robot_key,
                    XpEventKind::MasteryTier,
                    tier.bonus_xp,
                    None,
                    None,
                    Some(tier_num),
                    None,
                )?;
                if outcome == InsertOutcome::Inserted {
                    earned += tier.bonus_xp;
                    current_tier = tier_num;
                    tx.execute(
                        "UPDATE student_robot_stats
                         SET mastery_tier = ?3,
                             robot_xp_total = robot_xp_total + ?4
                         WHERE student_id = ?1 AND robot_key = ?2",
                        params![student_id, robot_key, current_tier, tier.bonus_xp],
                    )?;
                }
            }
        }

        stats::bump_global_stats(&tx, &rules.level_curve, student_id, earned)?;

        tx.commit()?;
        Ok(())
    }
}
