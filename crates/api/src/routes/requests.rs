//! Route definitions for the request lifecycle (CNT-02, CNT-03).
//!
//! ```text
//! POST   /                                  create_request
//! GET    /{request_id}                      get_request
//! POST   /{request_id}/approve              approve_request
//! POST   /{request_id}/reject               reject_request
//! POST   /{request_id}/reject-not-received  reject_not_received
//! POST   /{request_id}/receive              mark_received
//! POST   /{request_id}/complete             complete_request
//! POST   /{request_id}/return               mark_returned
//! POST   /{request_id}/verify-return        verify_return
//! GET    /{request_id}/events               request_timeline
//! POST   /{request_id}/handovers            initiate_handover
//! POST   /{request_id}/handover-requests    request_handover
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{handover_requests, handovers, requests};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(requests::create_request))
        .route("/{request_id}", get(requests::get_request))
        .route("/{request_id}/approve", post(requests::approve_request))
        .route("/{request_id}/reject", post(requests::reject_request))
        .route(
            "/{request_id}/reject-not-received",
            post(requests::reject_not_received),
        )
        .route("/{request_id}/receive", post(requests::mark_received))
        .route("/{request_id}/complete", post(requests::complete_request))
        .route("/{request_id}/return", post(requests::mark_returned))
        .route("/{request_id}/verify-return", post(requests::verify_return))
        .route("/{request_id}/events", get(requests::request_timeline))
        .route("/{request_id}/handovers", post(handovers::initiate_handover))
        .route(
            "/{request_id}/handover-requests",
            post(handover_requests::request_handover),
        )
}
