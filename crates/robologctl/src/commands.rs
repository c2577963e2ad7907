//! Command implementations for robologctl.

use crate::client::ApiClient;
use anyhow::Result;
use robolog_common::xp::{XpEvent, XpStatsResponse};
use robolog_common::Student;
use serde_json::json;

pub async fn status(client: &ApiClient) -> Result<()> {
    let body = client.get("/v1/health").await?;
    println!(
        "robologd {} - {} (up {}s)",
        body["version"].as_str().unwrap_or("?"),
        body["status"].as_str().unwrap_or("?"),
        body["uptime_secs"].as_u64().unwrap_or(0)
    );
    Ok(())
}

pub async fn stats(client: &ApiClient, student: &str) -> Result<()> {
    let body = client
        .get(&format!("/v1/xp/stats?student={student}"))
        .await?;
    let stats: XpStatsResponse = serde_json::from_value(body["stats"].clone())?;

    println!(
        "Level {}  ({} XP total, {}/{} into the next level)",
        stats.student.level,
        stats.student.total_xp,
        stats.student.xp_in_level,
        stats.student.next_level_xp
    );
    if stats.robots.is_empty() {
        println!("No robot progress yet.");
        return Ok(());
    }
    println!();
    println!(
        "{:<16} {:>8} {:>8} {:>8} {:>6}",
        "ROBOT", "XP", "ITEMS", "LEVELS", "TIER"
    );
    for (robot, r) in &stats.robots {
        println!(
            "{:<16} {:>8} {:>8} {:>8} {:>6}",
            robot, r.robot_xp, r.items_done, r.levels_complete, r.mastery_tier
        );
    }
    Ok(())
}

pub async fn students_list(client: &ApiClient) -> Result<()> {
    let body = client.get("/v1/admin/students").await?;
    let students: Vec<Student> = serde_json::from_value(body["students"].clone())?;
    if students.is_empty() {
        println!("No students.");
        return Ok(());
    }
    println!("{:<38} {:<24} {:<12}", "ID", "NAME", "COURSE");
    for s in &students {
        println!("{:<38} {:<24} {:<12}", s.id, s.display_name, s.course);
    }
    Ok(())
}

pub async fn students_add(client: &ApiClient, name: &str, course: &str) -> Result<()> {
    let body = client
        .post(
            "/v1/admin/students",
            json!({ "display_name": name, "course": course }),
        )
        .await?;
    println!(
        "Added {} ({})",
        body["student"]["display_name"].as_str().unwrap_or(name),
        body["student"]["id"].as_str().unwrap_or("?")
    );
    Ok(())
}

pub async fn students_rename(
    client: &ApiClient,
    id: &str,
    name: &str,
    course: &str,
) -> Result<()> {
    client
        .patch(
            &format!("/v1/admin/students/{id}"),
            json!({ "display_name": name, "course": course }),
        )
        .await?;
    println!("Updated {id}");
    Ok(())
}

pub async fn students_remove(client: &ApiClient, ids: &[String]) -> Result<()> {
    let body = client
        .delete("/v1/admin/students", json!({ "ids": ids }))
        .await?;
    println!("Removed {} student(s)", body["deleted"].as_u64().unwrap_or(0));
    Ok(())
}

pub async fn locks_list(client: &ApiClient, robot: &str, course: &str) -> Result<()> {
    let body = client
        .get(&format!("/v1/admin/levels?robot={robot}&course={course}"))
        .await?;
    let locks = body["locks"].as_object().cloned().unwrap_or_default();
    if locks.is_empty() {
        println!("No locks configured - every level is open.");
        return Ok(());
    }
    for (level, unlocked) in &locks {
        let state = if unlocked.as_bool().unwrap_or(false) {
            "open"
        } else {
            "locked"
        };
        println!("{level:<24} {state}");
    }
    Ok(())
}

pub async fn locks_set(
    client: &ApiClient,
    robot: &str,
    level: &str,
    course: &str,
    unlocked: bool,
) -> Result<()> {
    client
        .post(
            "/v1/admin/levels",
            json!({ "robot": robot, "level": level, "course": course, "unlocked": unlocked }),
        )
        .await?;
    println!(
        "{} {level} on {robot}",
        if unlocked { "Unlocked" } else { "Locked" }
    );
    Ok(())
}

pub async fn reset_progress(
    client: &ApiClient,
    student: &str,
    robot: &str,
    up_to: Option<usize>,
) -> Result<()> {
    client
        .post(
            &format!("/v1/admin/students/{student}/reset"),
            json!({ "action": "reset_progress", "robot": robot, "up_to_level_index": up_to }),
        )
        .await?;
    match up_to {
        Some(n) => println!("Reset progress for {student} on {robot} (levels 0..={n})"),
        None => println!("Reset progress for {student} on {robot}"),
    }
    Ok(())
}

pub async fn reset_xp(client: &ApiClient, student: &str, robot: Option<&str>) -> Result<()> {
    let scope = if robot.is_some() { "robot" } else { "student" };
    client
        .post(
            &format!("/v1/admin/students/{student}/reset"),
            json!({ "action": "reset_xp", "scope": scope, "robot": robot }),
        )
        .await?;
    match robot {
        Some(robot) => println!("Reset XP for {student} on {robot}"),
        None => println!("Reset all XP for {student}"),
    }
    Ok(())
}

pub async fn award(
    client: &ApiClient,
    student: &str,
    robot: &str,
    amount: i64,
    note: Option<&str>,
) -> Result<()> {
    client
        .post(
            "/v1/admin/award",
            json!({ "student": student, "robot": robot, "amount": amount, "note": note }),
        )
        .await?;
    println!("Awarded {amount} XP to {student} on {robot}");
    Ok(())
}

pub async fn events(client: &ApiClient, student: &str, robot: Option<&str>) -> Result<()> {
    let path = match robot {
        Some(robot) => format!("/v1/admin/events?student={student}&robot={robot}"),
        None => format!("/v1/admin/events?student={student}"),
    };
    let body = client.get(&path).await?;
    let events: Vec<XpEvent> = serde_json::from_value(body["events"].clone())?;
    if events.is_empty() {
        println!("No XP events.");
        return Ok(());
    }
    println!(
        "{:<22} {:<16} {:<16} {:>6}  {}",
        "WHEN", "ROBOT", "KIND", "XP", "DETAIL"
    );
    for e in &events {
        let detail = e
            .item_key
            .as_deref()
            .or(e.level_key.as_deref())
            .or(e.meta.as_deref())
            .map(String::from)
            .or_else(|| e.tier.map(|t| format!("tier {t}")))
            .unwrap_or_default();
        println!(
            "{:<22} {:<16} {:<16} {:>6}  {}",
            &e.occurred_at[..e.occurred_at.len().min(19)],
            e.robot_key,
            e.kind.as_str(),
            e.delta,
            detail
        );
    }
    Ok(())
}
