//! XP engine behavior: idempotent grants, level completion, mastery tiers.

use robolog_common::xp::{ProgressDelta, StatusChange, XpEventKind};
use robolog_common::{Checklist, ChecklistItem, ChecklistLevel, Database, ItemStatus};

/// A checklist with `levels` levels of `items_per_level` items each, keys
/// `l<level>-item-<n>`.
fn training_checklist(levels: usize, items_per_level: usize) -> Checklist {
    Checklist {
        robot: "rvr_plus".to_string(),
        title: "RVR+ Training".to_string(),
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

/// Persist `items` as done (recording real prev statuses) and run the engine
/// once over the whole batch, the way the progress endpoint does.
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

fn count_kind(db: &Database, student: &str, kind: XpEventKind) -> usize {
    db.list_xp_events(student, None)
        .unwrap()
        .iter()
        .filter(|e| e.kind == kind)
        .count()
}

#[test]
fn base_xp_per_completed_item() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(2, 3);

    complete_items(&db, &checklist, "s1", &["l1-item-1", "l1-item-2"]);

    let stats = db.get_stats("s1").unwrap();
    assert_eq!(stats.student.total_xp, 20);
    assert_eq!(stats.robots["rvr_plus"].robot_xp, 20);
    assert_eq!(stats.robots["rvr_plus"].items_done, 2);
    assert_eq!(count_kind(&db, "s1", XpEventKind::ItemComplete), 2);
    assert_eq!(count_kind(&db, "s1", XpEventKind::LevelComplete), 0);
}

#[test]
fn empty_effect_delta_is_a_noop() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(1, 3);

    // in_progress only, nothing newly done
    let mut delta = ProgressDelta::new();
    let prev = db
        .upsert_status("s1", "rvr_plus", "l1-item-1", ItemStatus::InProgress, None)
        .unwrap();
    delta.insert(
        "l1-item-1".to_string(),
        StatusChange {
            prev,
            next: ItemStatus::InProgress,
        },
    );
    db.apply_progress_delta(Some(&checklist), "rvr_plus", "s1", &delta)
        .unwrap();

    assert!(db.list_xp_events("s1", None).unwrap().is_empty());
    assert_eq!(db.get_stats("s1").unwrap().student.total_xp, 0);
}

#[test]
fn applying_the_same_delta_twice_changes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(2, 3);

    let mut delta = ProgressDelta::new();
    for item in ["l1-item-1", "l1-item-2"] {
        let prev = db
            .upsert_status("s1", "rvr_plus", item, ItemStatus::Done, None)
            .unwrap();
        delta.insert(
            item.to_string(),
            StatusChange {
                prev,
                next: ItemStatus::Done,
            },
        );
    }
    db.apply_progress_delta(Some(&checklist), "rvr_plus", "s1", &delta)
        .unwrap();
    let first = db.get_stats("s1").unwrap();
    let first_events = db.list_xp_events("s1", None).unwrap().len();

    // A retried request replays the identical batch
    db.apply_progress_delta(Some(&checklist), "rvr_plus", "s1", &delta)
        .unwrap();
    let second = db.get_stats("s1").unwrap();

    assert_eq!(first.student.total_xp, second.student.total_xp);
    assert_eq!(
        first.robots["rvr_plus"].robot_xp,
        second.robots["rvr_plus"].robot_xp
    );
    assert_eq!(db.list_xp_events("s1", None).unwrap().len(), first_events);
}

#[test]
fn racing_duplicate_completion_credits_once() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(1, 3);

    // Two clients both claim todo -> done for the same item; the store sees
    // one write each, the ledger accepts exactly one grant.
    let claimed = StatusChange {
        prev: Some(ItemStatus::Todo),
        next: ItemStatus::Done,
    };
    let mut delta = ProgressDelta::new();
    delta.insert("l1-item-1".to_string(), claimed);

    db.upsert_status("s1", "rvr_plus", "l1-item-1", ItemStatus::Done, None)
        .unwrap();
    db.apply_progress_delta(Some(&checklist), "rvr_plus", "s1", &delta)
        .unwrap();
    db.upsert_status("s1", "rvr_plus", "l1-item-1", ItemStatus::Done, None)
        .unwrap();
    db.apply_progress_delta(Some(&checklist), "rvr_plus", "s1", &delta)
        .unwrap();

    assert_eq!(count_kind(&db, "s1", XpEventKind::ItemComplete), 1);
    assert_eq!(db.get_stats("s1").unwrap().robots["rvr_plus"].robot_xp, 10);
}

#[test]
fn level_completes_only_with_every_item_done() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(1, 3);

    complete_items(&db, &checklist, "s1", &["l1-item-1", "l1-item-2"]);
    assert_eq!(count_kind(&db, "s1", XpEventKind::LevelComplete), 0);

    complete_items(&db, &checklist, "s1", &["l1-item-3"]);
    let events = db.list_xp_events("s1", None).unwrap();
    let level_events: Vec<_> = events
        .iter()
        .filter(|e| e.kind == XpEventKind::LevelComplete)
        .collect();
    assert_eq!(level_events.len(), 1);
    assert_eq!(level_events[0].delta, 25);
    assert_eq!(level_events[0].level_key.as_deref(), Some("level-1"));

    let stats = db.get_stats("s1").unwrap();
    // 3 items + level bonus
    assert_eq!(stats.robots["rvr_plus"].robot_xp, 3 * 10 + 25);
    assert_eq!(stats.robots["rvr_plus"].levels_complete, 1);
}

#[test]
fn unmarking_never_subtracts_xp() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(1, 3);

    complete_items(&db, &checklist, "s1", &["l1-item-1"]);
    let before = db.get_stats("s1").unwrap();

    let prev = db
        .upsert_status("s1", "rvr_plus", "l1-item-1", ItemStatus::Todo, None)
        .unwrap();
    assert_eq!(prev, Some(ItemStatus::Done));
    let mut delta = ProgressDelta::new();
    delta.insert(
        "l1-item-1".to_string(),
        StatusChange {
            prev,
            next: ItemStatus::Todo,
        },
    );
    db.apply_progress_delta(Some(&checklist), "rvr_plus", "s1", &delta)
        .unwrap();

    let after = db.get_stats("s1").unwrap();
    assert_eq!(before.student.total_xp, after.student.total_xp);
    assert_eq!(
        before.robots["rvr_plus"].robot_xp,
        after.robots["rvr_plus"].robot_xp
    );
}

#[test]
fn mastery_tiers_grant_in_order_even_across_a_jump() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(3, 12);

    // 9 items done: below every threshold
    let first: Vec<String> = (1..=9).map(|i| format!("l1-item-{i}")).collect();
    let first: Vec<&str> = first.iter().map(String::as_str).collect();
    complete_items(&db, &checklist, "s1", &first);
    assert_eq!(db.get_stats("s1").unwrap().robots["rvr_plus"].mastery_tier, 0);

    // one batch jumps 9 -> 25 done, crossing tier 1 (10) and tier 2 (20)
    let mut second: Vec<String> = (10..=12).map(|i| format!("l1-item-{i}")).collect();
    second.extend((1..=12).map(|i| format!("l2-item-{i}")));
    second.push("l3-item-1".to_string());
    let second: Vec<&str> = second.iter().map(String::as_str).collect();
    complete_items(&db, &checklist, "s1", &second);

    let events = db.list_xp_events("s1", None).unwrap();
    let tiers: Vec<i64> = events
        .iter()
        .filter(|e| e.kind == XpEventKind::MasteryTier)
        .map(|e| e.tier.unwrap())
        .collect();
    assert_eq!(tiers, vec![1, 2]);
    let tier_bonus: i64 = events
        .iter()
        .filter(|e| e.kind == XpEventKind::MasteryTier)
        .map(|e| e.delta)
        .sum();
    assert_eq!(tier_bonus, 30 + 50);

    let stats = db.get_stats("s1").unwrap();
    assert_eq!(stats.robots["rvr_plus"].mastery_tier, 2);
    assert_eq!(stats.robots["rvr_plus"].items_done, 25);
    // 25 items + 2 completed levels + both tier bonuses
    assert_eq!(
        stats.robots["rvr_plus"].robot_xp,
        25 * 10 + 2 * 25 + 30 + 50
    );
}

#[test]
fn stats_never_decrease_across_engine_calls() {
    let db = Database::open_in_memory().unwrap();
    let checklist = training_checklist(2, 6);
    let all: Vec<String> = checklist
        .levels
        .iter()
        .flat_map(|l| l.items.iter().map(|it| it.key.clone()))
        .collect();

    let mut last = (0, 0, 0);
    for item in &all {
        complete_items(&db, &checklist, "s1", &[item.as_str()]);
        let stats = db.get_stats("s1").unwrap();
        let robot = &stats.robots["rvr_plus"];
        let now = (robot.robot_xp, robot.items_done, robot.mastery_tier);
        assert!(now.0 >= last.0);
        assert!(now.1 >= last.1);
        assert!(now.2 >= last.2);
        last = now;
    }
    assert_eq!(last.1, 12);
    assert_eq!(last.2, 1); // 12 items crosses the first tier only
}

#[test]
fn missing_checklist_still_grants_item_xp() {
    let db = Database::open_in_memory().unwrap();

    let prev = db
        .upsert_status("s1", "mystery_bot", "item-1", ItemStatus::Done, None)
        .unwrap();
    let mut delta = ProgressDelta::new();
    delta.insert(
        "item-1".to_string(),
        StatusChange {
            prev,
            next: ItemStatus::Done,
        },
    );
    db.apply_progress_delta(None, "mystery_bot", "s1", &delta)
        .unwrap();

    let events = db.list_xp_events("s1", None).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, XpEventKind::ItemComplete);
    assert_eq!(events[0].level_key, None);
    assert_eq!(count_kind(&db, "s1", XpEventKind::LevelComplete), 0);
}

#[test]
fn totals_aggregate_across_robots() {
    let db = Database::open_in_memory().unwrap();
    let rvr = training_checklist(1, 3);
    let mut picarx = training_checklist(1, 3);
    picarx.robot = "picarx".to_string();

    complete_items(&db, &rvr, "s1", &["l1-item-1", "l1-item-2"]);
    complete_items(&db, &picarx, "s1", &["l1-item-1"]);

    let stats = db.get_stats("s1").unwrap();
    assert_eq!(stats.robots["rvr_plus"].robot_xp, 20);
    assert_eq!(stats.robots["picarx"].robot_xp, 10);
    assert_eq!(stats.student.total_xp, 30);
    assert_eq!(stats.student.level, 1);
    assert_eq!(stats.student.next_level_xp, 50);
}
