//! Handlers for the request lifecycle commands and reads (CNT-02, CNT-03).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use casetrack_core::types::DbId;
use casetrack_db::models::request::CreateCaseNoteRequest;

use crate::error::AppResult;
use crate::middleware::actor::ActorUser;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

/// Default timeline page size.
const DEFAULT_TIMELINE_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyReturnBody {
    pub accept: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /api/v1/requests
pub async fn create_request(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCaseNoteRequest>,
) -> AppResult<impl IntoResponse> {
    let request = state.engine.create_request(&actor, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/requests/{request_id}
pub async fn get_request(
    _actor: ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = state.engine.get_request(request_id).await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/approve
pub async fn approve_request(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<ApproveBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .approve_request(&actor, request_id, input.remarks)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/reject
pub async fn reject_request(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<RejectBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .reject_request(&actor, request_id, &input.reason)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/reject-not-received
pub async fn reject_not_received(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<RejectBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .reject_not_received(&actor, request_id, &input.reason)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/receive
pub async fn mark_received(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<NotesBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .mark_received(&actor, request_id, input.notes)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/complete
pub async fn complete_request(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<NotesBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .complete_request(&actor, request_id, input.notes)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/return
pub async fn mark_returned(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<NotesBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .mark_returned(&actor, request_id, input.notes)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/requests/{request_id}/verify-return
pub async fn verify_return(
    ActorUser(actor): ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<VerifyReturnBody>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .engine
        .verify_return(&actor, request_id, input.accept, input.notes)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// GET /api/v1/requests/{request_id}/events
///
/// The audit timeline, ordered by `occurred_at` ascending.
pub async fn request_timeline(
    _actor: ActorUser,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Query(query): Query<TimelineQuery>,
) -> AppResult<impl IntoResponse> {
    let (events, total) = state
        .engine
        .request_timeline(
            request_id,
            query.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(PageResponse {
        data: events,
        total,
    }))
}
