//! SQLite database wrapper and schema.
//!
//! All durable state lives in one database: students, per-item progress,
//! level locks, the XP event ledger and the two aggregate stats tables.
//! The schema is created idempotently on open; the partial unique indexes
//! on `xp_events` are what make XP grants exactly-once (see `xp::engine`).

use crate::error::RobologError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the robolog database.
///
/// Request handlers run short transactions against a single connection; a
/// `Mutex` serializes them, which is plenty at classroom scale.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, RobologError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and dry runs).
    pub fn open_in_memory() -> Result<Self, RobologError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Create tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<(), RobologError> {
        let conn = self.lock();

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                course TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                student_id TEXT NOT NULL,
                robot_key TEXT NOT NULL,
                item_key TEXT NOT NULL,
                status TEXT NOT NULL,
                payload TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (student_id, robot_key, item_key)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS level_locks (
                robot_key TEXT NOT NULL,
                level_key TEXT NOT NULL,
                course TEXT NOT NULL DEFAULT '',
                unlocked INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (robot_key, level_key, course)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS xp_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id TEXT NOT NULL,
                robot_key TEXT NOT NULL,
                level_key TEXT,
                item_key TEXT,
                kind TEXT NOT NULL,
                delta INTEGER NOT NULL,
                tier INTEGER,
                meta TEXT,
                occurred_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // At most one grant per item, per level and per tier. Duplicate
        // inserts are absorbed with INSERT OR IGNORE, which is what makes
        // the engine idempotent under retries and concurrent toggles.
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_xp_events_item_once
             ON xp_events(student_id, robot_key, item_key)
             WHERE kind = 'item_complete'",
            [],
        )?;
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_xp_events_level_once
             ON xp_events(student_id, robot_key, level_key)
             WHERE kind = 'level_complete'",
            [],
        )?;
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_xp_events_tier_once
             ON xp_events(student_id, robot_key, tier)
             WHERE kind = 'mastery_tier'",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_xp_events_student
             ON xp_events(student_id)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS student_robot_stats (
                student_id TEXT NOT NULL,
                robot_key TEXT NOT NULL,
                robot_xp_total INTEGER NOT NULL DEFAULT 0,
                items_done_count INTEGER NOT NULL DEFAULT 0,
                levels_complete_count INTEGER NOT NULL DEFAULT 0,
                mastery_tier INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (student_id, robot_key)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS student_xp_stats (
                student_id TEXT PRIMARY KEY,
                total_xp INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1,
                xp_in_level INTEGER NOT NULL DEFAULT 0,
                last_event_at TEXT
            )
            "#,
            [],
        )?;

        Ok(())
    }
}
