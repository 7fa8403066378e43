//! Top-level router assembly.

use axum::Router;

use crate::routes;
use crate::state::AppState;

/// Build the `/api/v1` application router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1/health", routes::health::router())
        .nest("/api/v1/requests", routes::requests::router())
        .nest("/api/v1/handovers", routes::handovers::router())
        .nest(
            "/api/v1/handover-requests",
            routes::handover_requests::router(),
        )
        .nest("/api/v1/batches", routes::batches::router())
}
