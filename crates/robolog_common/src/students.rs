//! Student records and admin CRUD.

use crate::db::Database;
use crate::error::RobologError;
use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub course: String,
}

/// Collapse runs of whitespace and trim; names come from a classroom form.
fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn validate_name(name: &str) -> Result<(), RobologError> {
    let len = name.chars().count();
    if len < 2 {
        return Err(RobologError::Validation("name too short".to_string()));
    }
    if len > 80 {
        return Err(RobologError::Validation("name too long".to_string()));
    }
    Ok(())
}

fn validate_course(course: &str) -> Result<(), RobologError> {
    if course.chars().count() > 100 {
        return Err(RobologError::Validation("course too long".to_string()));
    }
    Ok(())
}

impl Database {
    /// All students, newest first.
    pub fn list_students(&self) -> Result<Vec<Student>, RobologError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, display_name, course FROM students ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Student {
                id: row.get(0)?,
                display_name: row.get(1)?,
                course: row.get(2)?,
            })
        })?;
        let mut students = Vec::new();
        for row in rows {
            students.push(row?);
        }
        Ok(students)
    }

    pub fn create_student(
        &self,
        display_name: &str,
        course: &str,
    ) -> Result<Student, RobologError> {
        let display_name = normalize(display_name);
        let course = normalize(course);
        validate_name(&display_name)?;
        validate_course(&course)?;

        let student = Student {
            id: Uuid::new_v4().to_string(),
            display_name,
            course,
        };
        let conn = self.lock();
        conn.execute(
            "INSERT INTO students (id, display_name, course, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                student.id,
                student.display_name,
                student.course,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(student)
    }

    pub fn update_student(
        &self,
        id: &str,
        display_name: &str,
        course: &str,
    ) -> Result<(), RobologError> {
        let display_name = normalize(display_name);
        let course = normalize(course);
        validate_name(&display_name)?;
        validate_course(&course)?;

        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE students SET display_name = ?2, course = ?3 WHERE id = ?1",
            params![id, display_name, course],
        )?;
        if changed == 0 {
            return Err(RobologError::NotFound(format!("student {id}")));
        }
        Ok(())
    }

    /// Delete students together with everything they own: progress rows,
    /// ledger events and both aggregate stats rows. One transaction, so a
    /// failure never leaves a half-deleted student behind.
    pub fn delete_students(&self, ids: &[String]) -> Result<usize, RobologError> {
        if ids.is_empty() {
            return Err(RobologError::Validation("no student ids given".to_string()));
        }
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for id in ids {
            tx.execute("DELETE FROM progress WHERE student_id = ?1", params![id])?;
            tx.execute("DELETE FROM xp_events WHERE student_id = ?1", params![id])?;
            tx.execute(
                "DELETE FROM student_robot_stats WHERE student_id = ?1",
                params![id],
            )?;
            tx.execute(
                "DELETE FROM student_xp_stats WHERE student_id = ?1",
                params![id],
            )?;
            deleted += tx.execute("DELETE FROM students WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ItemStatus;

    #[test]
    fn create_normalizes_and_validates() {
        let db = Database::open_in_memory().unwrap();
        let student = db.create_student("  Ada   Lovelace ", "Kurs  7b").unwrap();
        assert_eq!(student.display_name, "Ada Lovelace");
        assert_eq!(student.course, "Kurs 7b");

        assert!(db.create_student("A", "").is_err());
        assert!(db.create_student(&"x".repeat(81), "").is_err());
        assert!(db.create_student("Ok Name", &"c".repeat(101)).is_err());
    }

    #[test]
    fn update_unknown_student_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update_student("missing", "New Name", "").unwrap_err();
        assert!(matches!(err, RobologError::NotFound(_)));
    }

    #[test]
    fn delete_removes_owned_rows() {
        let db = Database::open_in_memory().unwrap();
        let student = db.create_student("Grace Hopper", "").unwrap();
        db.upsert_status(&student.id, "rvr_plus", "it-1", ItemStatus::Done, None)
            .unwrap();
        db.apply_progress_delta(
            None,
            "rvr_plus",
            &student.id,
            &[(
                "it-1".to_string(),
                crate::xp::engine::StatusChange {
                    prev: None,
                    next: ItemStatus::Done,
                },
            )]
            .into_iter()
            .collect(),
        )
        .unwrap();

        let deleted = db.delete_students(&[student.id.clone()]).unwrap();
        assert_eq!(deleted, 1);
        assert!(db.list_students().unwrap().is_empty());
        assert!(db.get_progress(&student.id, "rvr_plus").unwrap().is_empty());
        let stats = db.get_stats(&student.id).unwrap();
        assert_eq!(stats.student.total_xp, 0);
        assert!(stats.robots.is_empty());
    }
}
