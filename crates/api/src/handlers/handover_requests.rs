//! Handlers for the mediated handover protocol (CNT-05).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use casetrack_core::types::DbId;
use casetrack_db::models::handover_request::CreateHandoverRequest;
use casetrack_engine::handover_requests::HandoverResponse;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::ActorUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    /// `"approve"` or `"reject"`.
    pub action: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
    pub notes: Option<String>,
}

/// POST /api/v1/requests/{request_id}/handover-requests
///
/// A non-holder asks the current holder to release the case note.
pub async fn request_handover(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<CreateHandoverRequest>,
) -> AppResult<impl IntoResponse> {
    let hr = state
        .engine
        .request_handover(&actor, request_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: hr })))
}

/// GET /api/v1/handover-requests/{handover_request_id}
pub async fn get_handover_request(
    _actor: ActorUser,
    State(state): State<AppState>,
    Path(handover_request_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let hr = state.engine.get_handover_request(handover_request_id).await?;
    Ok(Json(DataResponse { data: hr }))
}

/// GET /api/v1/handover-requests/pending
///
/// Handover requests awaiting the calling holder's response.
pub async fn pending_for_holder(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let pending = state
        .engine
        .pending_handover_requests_for_holder(actor.user_id)
        .await?;
    Ok(Json(DataResponse { data: pending }))
}

/// POST /api/v1/handover-requests/{handover_request_id}/respond
///
/// The current holder approves or rejects the proposal.
pub async fn respond_handover_request(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(handover_request_id): Path<DbId>,
    Json(input): Json<RespondBody>,
) -> AppResult<impl IntoResponse> {
    let response = match input.action.as_str() {
        "approve" => HandoverResponse::Approve,
        "reject" => HandoverResponse::Reject,
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown action '{other}'. Expected 'approve' or 'reject'"
            )))
        }
    };

    let hr = state
        .engine
        .respond_handover_request(&actor, handover_request_id, response, input.notes)
        .await?;
    Ok(Json(DataResponse { data: hr }))
}

/// POST /api/v1/handover-requests/{handover_request_id}/verify
///
/// MR staff (or the requester) confirms the physical transfer; custody
/// moves now.
pub async fn verify_handover_request(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(handover_request_id): Path<DbId>,
    Json(input): Json<NotesBody>,
) -> AppResult<impl IntoResponse> {
    let hr = state
        .engine
        .verify_handover_request(&actor, handover_request_id, input.notes)
        .await?;
    Ok(Json(DataResponse { data: hr }))
}
