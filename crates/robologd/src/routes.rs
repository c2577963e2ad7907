//! API routes for robologd.
//!
//! Students read checklists and write progress; the XP engine runs behind
//! the progress write and must never fail it. Admin endpoints sit behind
//! the static PIN gate and do surface their errors - resets and awards are
//! explicit actions with a success/failure expectation.

use crate::server::AppState;
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use robolog_common::locks::filter_unlocked_levels;
use robolog_common::xp::{ProgressDelta, StatusChange, XpEvent, XpResetScope, XpStatsResponse};
use robolog_common::{ChecklistLevel, ItemStatus, RobologError, RobotInfo, Student};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;

fn store_error(e: RobologError) -> (StatusCode, String) {
    let status = match &e {
        RobologError::Validation(_) => StatusCode::BAD_REQUEST,
        RobologError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => {
            error!("  Store error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Checklist Routes
// ============================================================================

pub fn checklist_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/robots", get(list_robots))
        .route("/v1/checklist", get(get_checklist))
}

#[derive(Serialize)]
struct RobotsResponse {
    robots: Vec<RobotInfo>,
}

async fn list_robots(State(state): State<AppStateArc>) -> Json<RobotsResponse> {
    Json(RobotsResponse {
        robots: state.config.robots.clone(),
    })
}

#[derive(Deserialize)]
struct ChecklistQuery {
    robot: String,
    #[serde(default)]
    course: String,
}

#[derive(Serialize)]
struct ChecklistResponse {
    robot: String,
    title: String,
    levels: Vec<ChecklistLevel>,
    locks: BTreeMap<String, bool>,
}

async fn get_checklist(
    State(state): State<AppStateArc>,
    Query(query): Query<ChecklistQuery>,
) -> Result<Json<ChecklistResponse>, (StatusCode, String)> {
    if query.robot.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "robot parameter required".into()));
    }
    let checklist = state.checklists.get(&query.robot).ok_or((
        StatusCode::NOT_FOUND,
        format!("no checklist for robot '{}'", query.robot),
    ))?;
    let locks = state
        .db
        .get_level_locks(&query.robot, &query.course)
        .map_err(store_error)?;
    let levels = filter_unlocked_levels(&checklist.levels, &locks)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ChecklistResponse {
        robot: checklist.robot.clone(),
        title: checklist.title.clone(),
        levels,
        locks,
    }))
}

// ============================================================================
// Progress Routes
// ============================================================================

pub fn progress_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/progress", get(get_progress).post(post_progress))
}

#[derive(Deserialize)]
struct ProgressQuery {
    #[serde(default)]
    robot: String,
    #[serde(default)]
    student: String,
}

#[derive(Serialize)]
struct ProgressResponse {
    progress: BTreeMap<String, ItemStatus>,
}

async fn get_progress(
    State(state): State<AppStateArc>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, (StatusCode, String)> {
    // An unselected student/robot is an empty board, not an error
    if query.robot.is_empty() || query.student.is_empty() {
        return Ok(Json(ProgressResponse {
            progress: BTreeMap::new(),
        }));
    }
    let progress = state
        .db
        .get_progress(&query.student, &query.robot)
        .map_err(store_error)?;
    Ok(Json(ProgressResponse { progress }))
}

#[derive(Deserialize)]
struct ProgressWriteRequest {
    robot: String,
    student: String,
    delta: BTreeMap<String, ItemStatus>,
}

#[derive(Serialize)]
struct ProgressWriteResponse {
    ok: bool,
    /// Refreshed stats so the client can update its XP indicators without
    /// a second round trip. Missing when the stats read itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<XpStatsResponse>,
}

async fn post_progress(
    State(state): State<AppStateArc>,
    Json(req): Json<ProgressWriteRequest>,
) -> Result<Json<ProgressWriteResponse>, (StatusCode, String)> {
    if req.robot.is_empty() || req.student.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "robot and student required".into()));
    }

    // Persist statuses first; the delta handed to the engine reflects what
    // the store actually replaced
    let mut delta = ProgressDelta::new();
    for (item_key, status) in &req.delta {
        let prev = state
            .db
            .upsert_status(&req.student, &req.robot, item_key, *status, None)
            .map_err(store_error)?;
        delta.insert(
            item_key.clone(),
            StatusChange {
                prev,
                next: *status,
            },
        );
    }

    // XP is best-effort: a scoring failure must never cost the student
    // their checklist progress. The ledger self-corrects on the next
    // successful invocation.
    let checklist = state.checklists.get(&req.robot);
    if let Err(e) = state
        .db
        .apply_progress_delta(checklist, &req.robot, &req.student, &delta)
    {
        error!(
            "  XP engine failed for student {} on {}: {}",
            req.student, req.robot, e
        );
    }

    let stats = match state.db.get_stats(&req.student) {
        Ok(stats) => Some(stats),
        Err(e) => {
            error!("  Stats read failed for {}: {}", req.student, e);
            None
        }
    };
    Ok(Json(ProgressWriteResponse { ok: true, stats }))
}

// ============================================================================
// Stats Routes
// ============================================================================

pub fn stats_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/xp/stats", get(get_stats))
}

#[derive(Deserialize)]
struct StatsQuery {
    #[serde(default)]
    student: String,
}

#[derive(Serialize)]
struct StatsResponse {
    ok: bool,
    stats: XpStatsResponse,
}

async fn get_stats(
    State(state): State<AppStateArc>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    if query.student.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "student parameter required".into()));
    }
    let stats = state.db.get_stats(&query.student).map_err(store_error)?;
    Ok(Json(StatsResponse { ok: true, stats }))
}

// ============================================================================
// Admin Routes (PIN-gated)
// ============================================================================

pub fn admin_routes(state: AppStateArc) -> Router<AppStateArc> {
    Router::new()
        .route(
            "/v1/admin/students",
            get(list_students)
                .post(create_student)
                .delete(delete_students_bulk),
        )
        .route(
            "/v1/admin/students/:id",
            axum::routing::patch(update_student).delete(delete_student),
        )
        .route("/v1/admin/students/:id/reset", post(reset_student))
        .route("/v1/admin/levels", get(get_locks).post(set_lock))
        .route("/v1/admin/award", post(award))
        .route("/v1/admin/events", get(list_events))
        .layer(middleware::from_fn_with_state(state, require_admin_pin))
}

async fn require_admin_pin(
    State(state): State<AppStateArc>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let pin = &state.config.admin_pin;
    if pin.is_empty() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "admin PIN not configured".into(),
        ));
    }
    let supplied = req
        .headers()
        .get("x-admin-pin")
        .and_then(|value| value.to_str().ok());
    if supplied != Some(pin.as_str()) {
        return Err((StatusCode::UNAUTHORIZED, "invalid admin PIN".into()));
    }
    Ok(next.run(req).await)
}

#[derive(Serialize)]
struct StudentsResponse {
    students: Vec<Student>,
}

async fn list_students(
    State(state): State<AppStateArc>,
) -> Result<Json<StudentsResponse>, (StatusCode, String)> {
    let students = state.db.list_students().map_err(store_error)?;
    Ok(Json(StudentsResponse { students }))
}

#[derive(Deserialize)]
struct StudentUpsertRequest {
    display_name: String,
    #[serde(default)]
    course: String,
}

#[derive(Serialize)]
struct StudentCreatedResponse {
    ok: bool,
    student: Student,
}

async fn create_student(
    State(state): State<AppStateArc>,
    Json(req): Json<StudentUpsertRequest>,
) -> Result<Json<StudentCreatedResponse>, (StatusCode, String)> {
    let student = state
        .db
        .create_student(&req.display_name, &req.course)
        .map_err(store_error)?;
    info!("  Created student {} ({})", student.display_name, student.id);
    Ok(Json(StudentCreatedResponse { ok: true, student }))
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

async fn update_student(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
    Json(req): Json<StudentUpsertRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    state
        .db
        .update_student(&id, &req.display_name, &req.course)
        .map_err(store_error)?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Serialize)]
struct DeletedResponse {
    ok: bool,
    deleted: usize,
}

async fn delete_student(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, (StatusCode, String)> {
    let deleted = state.db.delete_students(&[id]).map_err(store_error)?;
    Ok(Json(DeletedResponse { ok: true, deleted }))
}

#[derive(Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

async fn delete_students_bulk(
    State(state): State<AppStateArc>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<DeletedResponse>, (StatusCode, String)> {
    let deleted = state.db.delete_students(&req.ids).map_err(store_error)?;
    info!("  Deleted {} student(s)", deleted);
    Ok(Json(DeletedResponse { ok: true, deleted }))
}

#[derive(Deserialize)]
struct ResetRequest {
    action: String,
    #[serde(default)]
    robot: Option<String>,
    #[serde(default)]
    up_to_level_index: Option<usize>,
    #[serde(default)]
    scope: Option<XpResetScope>,
}

#[derive(Serialize)]
struct ResetResponse {
    ok: bool,
    action: String,
}

async fn reset_student(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, (StatusCode, String)> {
    match req.action.as_str() {
        "reset_progress" => {
            let robot = req
                .robot
                .as_deref()
                .filter(|r| !r.is_empty())
                .ok_or((StatusCode::BAD_REQUEST, "robot required".into()))?;
            let checklist = state.checklists.get(robot).ok_or((
                StatusCode::NOT_FOUND,
                format!("no checklist for robot '{robot}'"),
            ))?;
            state
                .db
                .reset_progress(checklist, &id, robot, req.up_to_level_index)
                .map_err(store_error)?;
            info!(
                "  Reset progress for student {} on {} (up_to: {:?})",
                id, robot, req.up_to_level_index
            );
        }
        "reset_xp" => {
            let scope = req.scope.unwrap_or(XpResetScope::Student);
            state
                .db
                .reset_xp(&id, scope, req.robot.as_deref())
                .map_err(store_error)?;
            info!("  Reset XP for student {} (scope: {:?})", id, scope);
        }
        other => {
            return Err((StatusCode::BAD_REQUEST, format!("invalid action '{other}'")));
        }
    }
    Ok(Json(ResetResponse {
        ok: true,
        action: req.action,
    }))
}

#[derive(Deserialize)]
struct LocksQuery {
    robot: String,
    #[serde(default)]
    course: String,
}

#[derive(Serialize)]
struct LocksResponse {
    locks: BTreeMap<String, bool>,
}

async fn get_locks(
    State(state): State<AppStateArc>,
    Query(query): Query<LocksQuery>,
) -> Result<Json<LocksResponse>, (StatusCode, String)> {
    if query.robot.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "robot parameter required".into()));
    }
    let locks = state
        .db
        .get_level_locks(&query.robot, &query.course)
        .map_err(store_error)?;
    Ok(Json(LocksResponse { locks }))
}

#[derive(Deserialize)]
struct SetLockRequest {
    robot: String,
    level: String,
    #[serde(default)]
    course: String,
    unlocked: bool,
}

async fn set_lock(
    State(state): State<AppStateArc>,
    Json(req): Json<SetLockRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    if req.robot.is_empty() || req.level.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "robot and level required".into()));
    }
    state
        .db
        .set_level_lock(&req.robot, &req.level, &req.course, req.unlocked)
        .map_err(store_error)?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct AwardRequest {
    student: String,
    robot: String,
    amount: i64,
    #[serde(default)]
    note: Option<String>,
}

async fn award(
    State(state): State<AppStateArc>,
    Json(req): Json<AwardRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    if req.student.is_empty() || req.robot.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "student and robot required".into()));
    }
    state
        .db
        .award_xp(&req.student, &req.robot, req.amount, req.note.as_deref())
        .map_err(store_error)?;
    info!(
        "  Awarded {} XP to student {} on {}",
        req.amount, req.student, req.robot
    );
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct EventsQuery {
    student: String,
    #[serde(default)]
    robot: Option<String>,
}

#[derive(Serialize)]
struct EventsResponse {
    events: Vec<XpEvent>,
}

async fn list_events(
    State(state): State<AppStateArc>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, (StatusCode, String)> {
    if query.student.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "student parameter required".into()));
    }
    let events = state
        .db
        .list_xp_events(&query.student, query.robot.as_deref())
        .map_err(store_error)?;
    Ok(Json(EventsResponse { events }))
}
