//! Reset operations: authoritative recomputation, never decrements.

use robolog_common::xp::{ProgressDelta, StatusChange, XpEventKind, XpResetScope};
use robolog_common::{Checklist, ChecklistItem, ChecklistLevel, Database, ItemStatus};

fn training_checklist(robot: &str, levels: usize, items_per_level: usize) -> Checklist {
    Checklist {
        robot: robot.to_string(),
        title: format!("{robot} Training"),
        levels: (0..levels)
            .map(|l| ChecklistLevel {
                key: format!("level-{}", l + 1),
                title: format!("Level {}", l + 1),
                items: (0..items_per_level)
                    .map(|i| ChecklistItem {
                        key: format!("l{}-item-{}", l + 1, i + 1),
                        label: format!("Task {}", i + 1),
                        description: None,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn complete_items(db: &Database, checklist: &Checklist, student: &str, items: &[&str]) {
    let robot = checklist.robot.clone();
    let mut delta = ProgressDelta::new();
    for item in items {
        let prev = db
            .upsert_status(student, &robot, item, ItemStatus::Done, None)
            .unwrap();
        delta.insert(
            (*item).to_string(),
            StatusChange {
                prev,
                next: ItemStatus::Done,
            },
        );
    }
    db.apply_progress_delta(Some(checklist), &robot, student, &delta)
        .unwrap();
}

fn complete_all(db: &Database, checklist: &Checklist, student: &str) {
    let items: Vec<String> = checklist
        .levels
        .iter()
        .flat_map(|l| l.items.iter().map(|it| it.key.clone()))
        .collect();
    let items: Vec<&str> = items.iter().map(String::as_str).collect();
    complete_items(db, checklist, student, &items);
}

#[test]
fn reset_xp_robot_scope_keeps_progress() {
    let db = Database::open_in_memory().unwrap();
    let rvr = training_checklist("rvr_plus", 2, 6);
    let picarx = training_checklist("picarx", 1, 4);

    complete_all(&db, &rvr, "s1");
    complete_all(&db, &picarx, "s1");

    let before = db.get_stats("s1").unwrap();
    let rvr_contribution = before.robots["rvr_plus"].robot_xp;
    assert!(rvr_contribution > 0);

    db.reset_xp("s1", XpResetScope::Robot, Some("rvr_plus")).unwrap();

    let after = db.get_stats("s1").unwrap();
    assert_eq!(after.robots["rvr_plus"].robot_xp, 0);
    assert_eq!(after.robots["rvr_plus"].mastery_tier, 0);
    assert_eq!(after.robots["rvr_plus"].levels_complete, 0);
    // checklist completion is untouched: progress rows and the done count stay
    assert_eq!(after.robots["rvr_plus"].items_done, before.robots["rvr_plus"].items_done);
    assert_eq!(db.count_done_items("s1", "rvr_plus").unwrap(), 12);
    // the global total shrinks by exactly what the robot had contributed
    assert_eq!(
        after.student.total_xp,
        before.student.total_xp - rvr_contribution
    );
    // the other robot's ledger is intact
    assert!(db
        .list_xp_events("s1", Some("picarx"))
        .unwrap()
        .iter()
        .all(|e| e.robot_key == "picarx"));
    assert!(db.list_xp_events("s1", Some("rvr_plus")).unwrap().is_empty());
}

#[test]
fn reset_xp_robot_scope_requires_robot_key() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.reset_xp("s1", XpResetScope::Robot, None).is_err());
}

#[test]
fn reset_xp_student_scope_clears_everything() {
    let db = Database::open_in_memory().unwrap();
    let rvr = training_checklist("rvr_plus", 1, 4);
    complete_all(&db, &rvr, "s1");
    db.award_xp("s1", "rvr_plus", 20, None).unwrap();

    db.reset_xp("s1", XpResetScope::Student, None).unwrap();

    let stats = db.get_stats("s1").unwrap();
    assert_eq!(stats.student.total_xp, 0);
    assert_eq!(stats.student.level, 1);
    assert!(stats.robots.is_empty());
    assert!(db.list_xp_events("s1", None).unwrap().is_empty());
    // progress rows survive a pure XP reset
    assert_eq!(db.count_done_items("s1", "rvr_plus").unwrap(), 4);
}

#[test]
fn reset_progress_full_wipes_robot() {
    let db = Database::open_in_memory().unwrap();
    let rvr = training_checklist("rvr_plus", 2, 6);
    complete_all(&db, &rvr, "s1");

    db.reset_progress(&rvr, "s1", "rvr_plus", None).unwrap();

    let stats = db.get_stats("s1").unwrap();
    assert_eq!(stats.student.total_xp, 0);
    assert_eq!(stats.robots["rvr_plus"].robot_xp, 0);
    assert_eq!(stats.robots["rvr_plus"].items_done, 0);
    assert_eq!(stats.robots["rvr_plus"].levels_complete, 0);
    assert_eq!(stats.robots["rvr_plus"].mastery_tier, 0);
    assert!(db.get_progress("s1", "rvr_plus").unwrap().is_empty());
    assert!(db.list_xp_events("s1", None).unwrap().is_empty());
}

#[test]
fn reset_progress_partial_recomputes_from_remaining_levels() {
    let db = Database::open_in_memory().unwrap();
    // two levels of 6; completing both crosses the first mastery tier
    let rvr = training_checklist("rvr_plus", 2, 6);
    complete_all(&db, &rvr, "s1");

    let before = db.get_stats("s1").unwrap();
    assert_eq!(before.robots["rvr_plus"].items_done, 12);
    assert_eq!(before.robots["rvr_plus"].mastery_tier, 1);

    // wipe level index 0 only
    db.reset_progress(&rvr, "s1", "rvr_plus", Some(0)).unwrap();

    let after = db.get_stats("s1").unwrap();
    let robot = &after.robots["rvr_plus"];
    // recomputed from the remaining level, not from cached pre-reset values
    assert_eq!(robot.items_done, 6);
    assert_eq!(robot.levels_complete, 1);
    // 6 done items no longer reach the 10-item tier; re-derived, not replayed
    assert_eq!(robot.mastery_tier, 0);
    // remaining ledger: 6 item grants + 1 level bonus (mastery rows all gone)
    assert_eq!(robot.robot_xp, 6 * 10 + 25);
    assert_eq!(after.student.total_xp, robot.robot_xp);

    let events = db.list_xp_events("s1", None).unwrap();
    assert!(events.iter().all(|e| e.kind != XpEventKind::MasteryTier));
    assert!(events
        .iter()
        .filter_map(|e| e.level_key.as_deref())
        .all(|k| k == "level-2"));
}

#[test]
fn progress_can_be_earned_again_after_reset() {
    let db = Database::open_in_memory().unwrap();
    let rvr = training_checklist("rvr_plus", 1, 3);
    complete_all(&db, &rvr, "s1");
    let first = db.get_stats("s1").unwrap().student.total_xp;

    db.reset_progress(&rvr, "s1", "rvr_plus", None).unwrap();
    complete_all(&db, &rvr, "s1");

    // deleted ledger rows free the uniqueness slots for a clean re-run
    let second = db.get_stats("s1").unwrap();
    assert_eq!(second.student.total_xp, first);
    assert_eq!(second.robots["rvr_plus"].levels_complete, 1);
}

#[test]
fn reset_leaves_other_students_alone() {
    let db = Database::open_in_memory().unwrap();
    let rvr = training_checklist("rvr_plus", 1, 4);
    complete_all(&db, &rvr, "s1");
    complete_all(&db, &rvr, "s2");

    db.reset_xp("s1", XpResetScope::Student, None).unwrap();

    assert_eq!(db.get_stats("s1").unwrap().student.total_xp, 0);
    let other = db.get_stats("s2").unwrap();
    assert_eq!(other.student.total_xp, 4 * 10 + 25);
}
