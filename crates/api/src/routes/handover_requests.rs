//! Route definitions for mediated handover requests (CNT-05).
//!
//! ```text
//! GET    /pending                          pending_for_holder
//! GET    /{handover_request_id}            get_handover_request
//! POST   /{handover_request_id}/respond    respond_handover_request
//! POST   /{handover_request_id}/verify     verify_handover_request
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::handover_requests;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(handover_requests::pending_for_holder))
        .route(
            "/{handover_request_id}",
            get(handover_requests::get_handover_request),
        )
        .route(
            "/{handover_request_id}/respond",
            post(handover_requests::respond_handover_request),
        )
        .route(
            "/{handover_request_id}/verify",
            post(handover_requests::verify_handover_request),
        )
}
