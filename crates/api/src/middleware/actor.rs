//! Actor-identity extractor for Axum handlers.
//!
//! Authentication itself is owned by the upstream gateway, which forwards
//! the authenticated user id in the `X-User-Id` header. This extractor
//! resolves that id against the `users` table (active users only) so
//! handlers receive a verified [`Actor`]; it never re-derives identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use casetrack_core::error::CoreError;
use casetrack_db::repositories::UserRepo;
use casetrack_engine::Actor;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the gateway-authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated actor extracted from the gateway header.
///
/// Use this as an extractor parameter in any handler that runs a command:
///
/// ```ignore
/// async fn my_handler(ActorUser(actor): ActorUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = actor.user_id, role = %actor.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ActorUser(pub Actor);

impl FromRequestParts<AppState> for ActorUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing X-User-Id header".into(),
                ))
            })?;

        let user_id: i64 = header.trim().parse().map_err(|_| {
            AppError::Core(CoreError::Unauthorized(
                "X-User-Id must be a numeric user id".into(),
            ))
        })?;

        let user = UserRepo::find_active_by_id(&state.pool, user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Unknown or inactive user".into(),
                ))
            })?;

        Ok(ActorUser(Actor::new(user.id, user.role)))
    }
}
