//! Administrative rollback: reset progress, reset XP.
//!
//! Both operations delete first and then recompute every aggregate from
//! the rows that remain - summing and recounting, never decrementing -
//! inside the same transaction. A cached pre-delete value is never
//! trusted.

use crate::checklist::Checklist;
use crate::db::Database;
use crate::error::RobologError;
use crate::progress;
use crate::xp::rules::rules_for_robot;
use crate::xp::stats;
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpResetScope {
    Student,
    Robot,
}

impl Database {
    /// Wipe checklist progress (and the XP it earned) for one robot,
    /// either entirely or for levels `0..=up_to_level_index` only.
    ///
    /// Mastery events always go in full: mastery is item-count-based, so
    /// after removing items none of them is trustworthy. The tier is then
    /// re-derived from the recounted items, not replayed from events.
    pub fn reset_progress(
        &self,
        checklist: &Checklist,
        student_id: &str,
        robot_key: &str,
        up_to_level_index: Option<usize>,
    ) -> Result<(), RobologError> {
        let chosen: Vec<_> = match up_to_level_index {
            None => checklist.levels.iter().collect(),
            Some(n) => checklist.levels.iter().take(n + 1).collect(),
        };
        let item_keys: Vec<&str> = chosen
            .iter()
            .flat_map(|l| l.items.iter().map(|it| it.key.as_str()))
            .collect();
        let level_keys: Vec<&str> = chosen.iter().map(|l| l.key.as_str()).collect();
        let rules = rules_for_robot(robot_key);

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        for item_key in &item_keys {
            tx.execute(
                "DELETE FROM progress
                 WHERE student_id = ?1 AND robot_key = ?2 AND item_key = ?3",
                params![student_id, robot_key, item_key],
            )?;
            tx.execute(
                "DELETE FROM xp_events
                 WHERE student_id = ?1 AND robot_key = ?2 AND item_key = ?3",
                params![student_id, robot_key, item_key],
            )?;
        }
        for level_key in &level_keys {
            tx.execute(
                "DELETE FROM xp_events
                 WHERE student_id = ?1 AND robot_key = ?2 AND level_key = ?3",
                params![student_id, robot_key, level_key],
            )?;
        }
        tx.execute(
            "DELETE FROM xp_events
             WHERE student_id = ?1 AND robot_key = ?2 AND kind = 'mastery_tier'",
            params![student_id, robot_key],
        )?;

        // Rebuild the robot row from what survived
        let robot_total: i64 = tx.query_row(
            "SELECT COALESCE(SUM(delta), 0) FROM xp_events
             WHERE student_id = ?1 AND robot_key = ?2",
            params![student_id, robot_key],
            |row| row.get(0),
        )?;
        let items_done = progress::count_done_items_conn(&tx, student_id, robot_key)?;
        let levels_complete: i64 = tx.query_row(
            "SELECT COUNT(*) FROM xp_events
             WHERE student_id = ?1 AND robot_key = ?2 AND kind = 'level_complete'",
            params![student_id, robot_key],
            |row| row.get(0),
        )?;
        let mastery_tier = rules.tier_for_count(items_done);
        tx.execute(
            "INSERT INTO student_robot_stats
                 (student_id, robot_key, robot_xp_total, items_done_count,
                  levels_complete_count, mastery_tier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(student_id, robot_key) DO UPDATE SET
                 robot_xp_total = excluded.robot_xp_total,
                 items_done_count = excluded.items_done_count,
                 levels_complete_count = excluded.levels_complete_count,
                 mastery_tier = excluded.mastery_tier",
            params![
                student_id,
                robot_key,
                robot_total,
                items_done,
                levels_complete,
                mastery_tier
            ],
        )?;

        stats::recompute_global_stats(&tx, &rules.level_curve, student_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Wipe scoring without touching checklist completion.
    ///
    /// Robot scope clears the robot's ledger and zeroes its XP, mastery
    /// tier and levels-complete count; `items_done_count` and the progress
    /// rows stay, since they describe what the student actually did.
    /// Student scope removes the student's entire ledger and every
    /// per-robot stats row.
    pub fn reset_xp(
        &self,
        student_id: &str,
        scope: XpResetScope,
        robot_key: Option<&str>,
    ) -> Result<(), RobologError> {
        let curve = rules_for_robot(robot_key.unwrap_or_default()).level_curve;
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        match scope {
            XpResetScope::Robot => {
                let robot_key = robot_key.ok_or_else(|| {
                    RobologError::Validation("robot_key required for robot scope".to_string())
                })?;
                tx.execute(
                    "DELETE FROM xp_events WHERE student_id = ?1 AND robot_key = ?2",
                    params![student_id, robot_key],
                )?;
                tx.execute(
                    "INSERT INTO student_robot_stats
                         (student_id, robot_key, robot_xp_total, items_done_count,
                          levels_complete_count, mastery_tier)
                     VALUES (?1, ?2, 0, 0, 0, 0)
                     ON CONFLICT(student_id, robot_key) DO UPDATE SET
                         robot_xp_total = 0,
                         levels_complete_count = 0,
                         mastery_tier = 0",
                    params![student_id, robot_key],
                )?;
            }
            XpResetScope::Student => {
                tx.execute(
                    "DELETE FROM xp_events WHERE student_id = ?1",
                    params![student_id],
                )?;
                tx.execute(
                    "DELETE FROM student_robot_stats WHERE student_id = ?1",
                    params![student_id],
                )?;
            }
        }

        stats::recompute_global_stats(&tx, &curve, student_id)?;
        tx.commit()?;
        Ok(())
    }
}
