//! Handlers for the direct handover protocol (CNT-04).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use casetrack_core::types::DbId;
use casetrack_db::models::handover::InitiateHandover;

use crate::error::AppResult;
use crate::middleware::actor::ActorUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotesBody {
    pub notes: Option<String>,
}

/// POST /api/v1/requests/{request_id}/handovers
///
/// The current holder initiates a direct handover.
pub async fn initiate_handover(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<InitiateHandover>,
) -> AppResult<impl IntoResponse> {
    let handover = state
        .engine
        .initiate_handover(&actor, request_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: handover })))
}

/// GET /api/v1/handovers/{handover_id}
pub async fn get_handover(
    _actor: ActorUser,
    State(state): State<AppState>,
    Path(handover_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let handover = state.engine.get_handover(handover_id).await?;
    Ok(Json(DataResponse { data: handover }))
}

/// POST /api/v1/handovers/{handover_id}/acknowledge
///
/// MR staff acknowledges the paperwork; custody moves to the receiving user.
pub async fn acknowledge_handover(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(handover_id): Path<DbId>,
    Json(input): Json<NotesBody>,
) -> AppResult<impl IntoResponse> {
    let handover = state
        .engine
        .acknowledge_handover(&actor, handover_id, input.notes)
        .await?;
    Ok(Json(DataResponse { data: handover }))
}

/// POST /api/v1/handovers/{handover_id}/confirm-receipt
///
/// The receiving holder confirms physical receipt of the case note.
pub async fn confirm_receipt(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(handover_id): Path<DbId>,
    Json(input): Json<NotesBody>,
) -> AppResult<impl IntoResponse> {
    let handover = state
        .engine
        .confirm_receipt(&actor, handover_id, input.notes)
        .await?;
    Ok(Json(DataResponse { data: handover }))
}
