use crate::types::DbId;

/// Domain error taxonomy for the custody engine.
///
/// Callers decide retry policy based on the variant: only [`Conflict`]
/// (a lost transition race) is retryable as-is; [`PreconditionFailed`]
/// requires re-reading state first.
///
/// [`Conflict`]: CoreError::Conflict
/// [`PreconditionFailed`]: CoreError::PreconditionFailed
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Reference not found or inactive: {entity} with id {id}")]
    ReferenceNotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sequence allocation failed for date key {0}")]
    SequenceAllocation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
