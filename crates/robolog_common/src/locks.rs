//! Per-level unlock gates.
//!
//! The admin opens levels for a course cohort one by one. No configured
//! locks for a (robot, course) means everything is unlocked, so a fresh
//! install behaves like a tracker without gates.

use crate::checklist::ChecklistLevel;
use crate::db::Database;
use crate::error::RobologError;
use chrono::Utc;
use rusqlite::params;
use std::collections::BTreeMap;

impl Database {
    pub fn get_level_locks(
        &self,
        robot_key: &str,
        course: &str,
    ) -> Result<BTreeMap<String, bool>, RobologError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT level_key, unlocked FROM level_locks
             WHERE robot_key = ?1 AND course = ?2",
        )?;
        let rows = stmt.query_map(params![robot_key, course], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;
        let mut locks = BTreeMap::new();
        for row in rows {
            let (level_key, unlocked) = row?;
            locks.insert(level_key, unlocked);
        }
        Ok(locks)
    }

    pub fn set_level_lock(
        &self,
        robot_key: &str,
        level_key: &str,
        course: &str,
        unlocked: bool,
    ) -> Result<(), RobologError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO level_locks (robot_key, level_key, course, unlocked, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(robot_key, level_key, course) DO UPDATE SET
                 unlocked = excluded.unlocked,
                 updated_at = excluded.updated_at",
            params![
                robot_key,
                level_key,
                course,
                unlocked,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

/// Keep only levels that are unlocked for the cohort.
pub fn filter_unlocked_levels<'a>(
    levels: &'a [ChecklistLevel],
    locks: &BTreeMap<String, bool>,
) -> Vec<&'a ChecklistLevel> {
    if locks.is_empty() {
        return levels.iter().collect();
    }
    levels
        .iter()
        .filter(|level| locks.get(&level.key).copied() == Some(true))
        .collect()
}
