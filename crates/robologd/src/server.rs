//! HTTP server for robologd.

use crate::routes;
use anyhow::Result;
use axum::Router;
use robolog_common::{ChecklistSet, Database, RobologConfig};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub db: Database,
    pub checklists: ChecklistSet,
    pub config: RobologConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: Database, checklists: ChecklistSet, config: RobologConfig) -> Self {
        Self {
            db,
            checklists,
            config,
            start_time: Instant::now(),
        }
    }
}

/// Assemble the full router. Split out of `run` so tests can drive it
/// without binding a socket.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::checklist_routes())
        .merge(routes::progress_routes())
        .merge(routes::stats_routes())
        .merge(routes::admin_routes(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.listen_addr.clone();
    let state = Arc::new(state);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
