use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub open_sessions: usize,
    pub business: String,
}

/// Liveness probe. Needs no actor headers.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        open_sessions: state.sessions.len().await,
        business: state.config.business.name.clone(),
    })
}
