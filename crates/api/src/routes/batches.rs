//! Route definitions for batches (CNT-08).
//!
//! ```text
//! POST   /                            create_batch
//! GET    /{batch_id}                  get_batch
//! GET    /{batch_id}/requests         list_batch_members
//! POST   /{batch_id}/verify-receipt   verify_batch_receipt
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::batches;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(batches::create_batch))
        .route("/{batch_id}", get(batches::get_batch))
        .route("/{batch_id}/requests", get(batches::list_batch_members))
        .route("/{batch_id}/verify-receipt", post(batches::verify_batch_receipt))
}
