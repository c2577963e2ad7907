//! The stats read path and the two global-stats writers.
//!
//! `level` and `xp_in_level` in `student_xp_stats` are caches; every read
//! re-derives them from `total_xp` through the curve resolver so a stale
//! cache can never reach the UI.

use crate::db::Database;
use crate::error::RobologError;
use crate::xp::rules::{default_rules, resolve_level};
use crate::xp::types::{RobotXpStats, StudentXpStats, XpEvent, XpEventKind, XpStatsResponse};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

impl Database {
    /// Global standing plus per-robot breakdown for one student.
    pub fn get_stats(&self, student_id: &str) -> Result<XpStatsResponse, RobologError> {
        let conn = self.lock();
        let rules = default_rules();

        let total: i64 = conn
            .query_row(
                "SELECT total_xp FROM student_xp_stats WHERE student_id = ?1",
                params![student_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let lp = resolve_level(total, &rules.level_curve);

        let mut stmt = conn.prepare(
            "SELECT robot_key, robot_xp_total, items_done_count,
                    levels_complete_count, mastery_tier
             FROM student_robot_stats WHERE student_id = ?1",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                RobotXpStats {
                    robot_xp: row.get(1)?,
                    items_done: row.get(2)?,
                    levels_complete: row.get(3)?,
                    mastery_tier: row.get(4)?,
                },
            ))
        })?;
        let mut robots = BTreeMap::new();
        for row in rows {
            let (robot_key, stats) = row?;
            robots.insert(robot_key, stats);
        }

        Ok(XpStatsResponse {
            student: StudentXpStats {
                total_xp: total,
                level: lp.level,
                xp_in_level: lp.xp_in_level.max(0),
                next_level_xp: lp.xp_to_next,
            },
            robots,
        })
    }

    /// The student's ledger, oldest first - the admin's audit trail.
    pub fn list_xp_events(
        &self,
        student_id: &str,
        robot_key: Option<&str>,
    ) -> Result<Vec<XpEvent>, RobologError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, student_id, robot_key, level_key, item_key, kind,
                    delta, tier, meta, occurred_at
             FROM xp_events
             WHERE student_id = ?1 AND (?2 IS NULL OR robot_key = ?2)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![student_id, robot_key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (id, student_id, robot_key, level_key, item_key, kind, delta, tier, meta, occurred_at) =
                row?;
            let Some(kind) = XpEventKind::parse(&kind) else {
                continue;
            };
            events.push(XpEvent {
                id,
                student_id,
                robot_key,
                level_key,
                item_key,
                kind,
                delta,
                tier,
                meta,
                occurred_at,
            });
        }
        Ok(events)
    }
}

/// Add `earned` to the student's cached total and refresh the derived
/// level fields. Used by the engine and by teacher awards.
pub(crate) fn bump_global_stats(
    conn: &Connection,
    curve: &[i64],
    student_id: &str,
    earned: i64,
) -> Result<(), RobologError> {
    let prior: i64 = conn
        .query_row(
            "SELECT total_xp FROM student_xp_stats WHERE student_id = ?1",
            params![student_id],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let total = prior + earned;
    let lp = resolve_level(total, curve);
    conn.execute(
        "INSERT INTO student_xp_stats (student_id, total_xp, level, xp_in_level, last_event_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(student_id) DO UPDATE SET
             total_xp = excluded.total_xp,
             level = excluded.level,
             xp_in_level = excluded.xp_in_level,
             last_event_at = excluded.last_event_at",
        params![
            student_id,
            total,
            lp.level,
            lp.xp_in_level,
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Rebuild the student's global stats from the ledger that is actually
/// there. Resets use this instead of arithmetic on cached values.
pub(crate) fn recompute_global_stats(
    conn: &Connection,
    curve: &[i64],
    student_id: &str,
) -> Result<(), RobologError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(delta), 0) FROM xp_events WHERE student_id = ?1",
        params![student_id],
        |row| row.get(0),
    )?;
    let lp = resolve_level(total, curve);
    conn.execute(
        "INSERT INTO student_xp_stats (student_id, total_xp, level, xp_in_level)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(student_id) DO UPDATE SET
             total_xp = excluded.total_xp,
             level = excluded.level,
             xp_in_level = excluded.xp_in_level",
        params![student_id, total, lp.level, lp.xp_in_level],
    )?;
    Ok(())
}
