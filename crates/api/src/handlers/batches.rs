//! Handlers for batch submission and receipt verification (CNT-08).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use casetrack_core::types::DbId;
use casetrack_db::models::batch::{Batch, CreateBatch};
use casetrack_db::models::request::CaseNoteRequest;

use crate::error::AppResult;
use crate::middleware::actor::ActorUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyReceiptBody {
    pub received_request_ids: Vec<DbId>,
    pub notes: Option<String>,
}

/// Response payload for batch creation: the batch plus its members.
#[derive(Debug, Serialize)]
pub struct CreatedBatch {
    pub batch: Batch,
    pub requests: Vec<CaseNoteRequest>,
}

/// POST /api/v1/batches
pub async fn create_batch(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Json(input): Json<CreateBatch>,
) -> AppResult<impl IntoResponse> {
    let (batch, requests) = state.engine.create_batch(&actor, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedBatch { batch, requests },
        }),
    ))
}

/// GET /api/v1/batches/{batch_id}
///
/// The batch with its derived status and live member counts.
pub async fn get_batch(
    _actor: ActorUser,
    State(state): State<AppState>,
    Path(batch_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let summary = state.engine.batch_summary(batch_id).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/batches/{batch_id}/requests
pub async fn list_batch_members(
    _actor: ActorUser,
    State(state): State<AppState>,
    Path(batch_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    // Surface a 404 for unknown batches rather than an empty list.
    state.engine.batch_summary(batch_id).await?;
    let members = state.engine.batch_members(batch_id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/batches/{batch_id}/verify-receipt
///
/// CA confirms physical receipt for a subset of approved members.
pub async fn verify_batch_receipt(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(batch_id): Path<DbId>,
    Json(input): Json<VerifyReceiptBody>,
) -> AppResult<impl IntoResponse> {
    let batch = state
        .engine
        .verify_batch_receipt(&actor, batch_id, &input.received_request_ids, input.notes)
        .await?;
    Ok(Json(DataResponse { data: batch }))
}
