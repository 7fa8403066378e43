//! Liveness/readiness probe.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/health
///
/// Verifies database connectivity.
pub async fn health(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    casetrack_db::health_check(&state.pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}
