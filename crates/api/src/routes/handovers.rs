//! Route definitions for direct handovers (CNT-04).
//!
//! ```text
//! GET    /{handover_id}                  get_handover
//! POST   /{handover_id}/acknowledge      acknowledge_handover
//! POST   /{handover_id}/confirm-receipt  confirm_receipt
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::handovers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{handover_id}", get(handovers::get_handover))
        .route(
            "/{handover_id}/acknowledge",
            post(handovers::acknowledge_handover),
        )
        .route(
            "/{handover_id}/confirm-receipt",
            post(handovers::confirm_receipt),
        )
}
