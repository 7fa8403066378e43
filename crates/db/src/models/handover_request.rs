//! Mediated handover request entity model and DTOs (CNT-05).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `handover_requests` table: a non-holder asking the
/// current holder to release a case note.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HandoverRequest {
    pub id: DbId,
    pub case_note_request_id: DbId,
    pub requested_by_user_id: DbId,
    pub current_holder_user_id: DbId,
    pub reason: String,
    pub priority: String,
    pub department_id: DbId,
    pub location_id: Option<DbId>,
    pub doctor_id: Option<DbId>,
    pub status: String,
    pub requested_at: Timestamp,
    pub responded_at: Option<Timestamp>,
    pub response_notes: Option<String>,
    pub verified_at: Option<Timestamp>,
    pub verified_by_user_id: Option<DbId>,
    pub verification_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a mediated handover request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateHandoverRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub priority: String,
    pub department_id: DbId,
    pub location_id: Option<DbId>,
    pub doctor_id: Option<DbId>,
}
