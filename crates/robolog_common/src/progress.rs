//! Per-student checklist progress.
//!
//! One row per (student, robot, item) with the current status and an
//! optional free-form payload. The XP engine never writes these rows; the
//! progress endpoint persists status first and then hands the engine the
//! prev/next delta that this store reports back.

use crate::db::Database;
use crate::error::RobologError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Todo,
    InProgress,
    Done,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Todo => "todo",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(ItemStatus::Todo),
            "in_progress" => Some(ItemStatus::InProgress),
            "done" => Some(ItemStatus::Done),
            _ => None,
        }
    }
}

impl Database {
    /// All recorded statuses for one student on one robot.
    pub fn get_progress(
        &self,
        student_id: &str,
        robot_key: &str,
    ) -> Result<BTreeMap<String, ItemStatus>, RobologError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT item_key, status FROM progress
             WHERE student_id = ?1 AND robot_key = ?2",
        )?;
        let rows = stmt.query_map(params![student_id, robot_key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = BTreeMap::new();
        for row in rows {
            let (item_key, status) = row?;
            if let Some(status) = ItemStatus::parse(&status) {
                map.insert(item_key, status);
            }
        }
        Ok(map)
    }

    /// Write one item status, returning the status it replaced.
    pub fn upsert_status(
        &self,
        student_id: &str,
        robot_key: &str,
        item_key: &str,
        status: ItemStatus,
        payload: Option<&str>,
    ) -> Result<Option<ItemStatus>, RobologError> {
        let conn = self.lock();
        let prev: Option<String> = conn
            .query_row(
                "SELECT status FROM progress
                 WHERE student_id = ?1 AND robot_key = ?2 AND item_key = ?3",
                params![student_id, robot_key, item_key],
                |row| row.get(0),
            )
            .optional()?;
        conn.execute(
            "INSERT INTO progress (student_id, robot_key, item_key, status, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(student_id, robot_key, item_key) DO UPDATE SET
                 status = excluded.status,
                 payload = COALESCE(excluded.payload, payload),
                 updated_at = excluded.updated_at",
            params![
                student_id,
                robot_key,
                item_key,
                status.as_str(),
                payload,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(prev.as_deref().and_then(ItemStatus::parse))
    }

    /// Statuses for a subset of items (the engine's level-completeness check).
    pub fn item_statuses(
        &self,
        student_id: &str,
        robot_key: &str,
        item_keys: &[&str],
    ) -> Result<HashMap<String, ItemStatus>, RobologError> {
        let conn = self.lock();
        item_statuses_conn(&conn, student_id, robot_key, item_keys)
    }

    /// Count of items currently `done` for (student, robot).
    ///
    /// This is THE done-count query: the engine's recount, the reset
    /// recompute and the mastery re-derivation all go through it so the
    /// predicate cannot drift apart.
    pub fn count_done_items(
        &self,
        student_id: &str,
        robot_key: &str,
    ) -> Result<i64, RobologError> {
        let conn = self.lock();
        count_done_items_conn(&conn, student_id, robot_key)
    }
}

pub(crate) fn item_statuses_conn(
    conn: &Connection,
    student_id: &str,
    robot_key: &str,
    item_keys: &[&str],
) -> Result<HashMap<String, ItemStatus>, RobologError> {
    let mut stmt = conn.prepare(
        "SELECT status FROM progress
         WHERE student_id = ?1 AND robot_key = ?2 AND item_key = ?3",
    )?;
    let mut map = HashMap::new();
    for item_key in item_keys {
        let status: Option<String> = stmt
            .query_row(params![student_id, robot_key, item_key], |row| row.get(0))
            .optional()?;
        if let Some(status) = status.as_deref().and_then(ItemStatus::parse) {
            map.insert((*item_key).to_string(), status);
        }
    }
    Ok(map)
}

pub(crate) fn count_done_items_conn(
    conn: &Connection,
    student_id: &str,
    robot_key: &str,
) -> Result<i64, RobologError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM progress
         WHERE student_id = ?1 AND robot_key = ?2 AND status = 'done'",
        params![student_id, robot_key],
        |row| row.get(0),
    )?;
    Ok(count)
}
