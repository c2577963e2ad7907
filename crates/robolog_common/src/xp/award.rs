//! Manual XP grants by the teacher.
//!
//! Unlike item/level/tier grants these are not uniqueness-guarded: every
//! award is a distinct ledger row. The aggregate updates reuse the
//! engine's additive path.

use crate::db::Database;
use crate::error::RobologError;
use crate::xp::engine::insert_event;
use crate::xp::rules::rules_for_robot;
use crate::xp::stats;
use crate::xp::types::XpEventKind;
use rusqlite::params;

impl Database {
    /// Grant `amount` XP to a student on a robot, with an optional note
    /// recorded on the ledger row. Negative amounts are allowed for manual
    /// corrections; zero is rejected.
    pub fn award_xp(
        &self,
        student_id: &str,
        robot_key: &str,
        amount: i64,
        note: Option<&str>,
    ) -> Result<(), RobologError> {
        if amount == 0 {
            return Err(RobologError::Validation(
                "award amount must be non-zero".to_string(),
            ));
        }
        let rules = rules_for_robot(robot_key);
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        insert_event(
            &tx,
            student_id,
            robot_key,
            XpEventKind::TeacherAward,
            amount,
            None,
            None,
            None,
            note,
        )?;
        tx.execute(
            "INSERT INTO student_robot_stats
                 (student_id, robot_key, robot_xp_total, items_done_count,
                  levels_complete_count, mastery_tier)
             VALUES (?1, ?2, ?3, 0, 0, 0)
             ON CONFLICT(student_id, robot_key) DO UPDATE SET
                 robot_xp_total = robot_xp_total + excluded.robot_xp_total",
            params![student_id, robot_key, amount],
        )?;
        stats::bump_global_stats(&tx, &rules.level_curve, student_id, amount)?;

        tx.commit()?;
        Ok(())
    }
}
