//! Case-note request entity model and DTOs (CNT-02).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `case_note_requests` table.
///
/// Carries both state machines of the aggregate: the approval dimension
/// (`status` + decision trail) and the custody dimension
/// (`current_pic_user_id`, `current_handover_id`, `handover_status`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseNoteRequest {
    pub id: DbId,
    pub request_number: String,
    pub patient_id: DbId,
    pub department_id: DbId,
    pub doctor_id: Option<DbId>,
    pub location_id: Option<DbId>,
    pub batch_id: Option<DbId>,
    pub priority: String,
    pub purpose: Option<String>,
    pub needed_date: Option<NaiveDate>,
    pub remarks: Option<String>,

    pub status: String,
    pub approved_at: Option<Timestamp>,
    pub approved_by_user_id: Option<DbId>,
    pub rejected_at: Option<Timestamp>,
    pub rejected_by_user_id: Option<DbId>,
    pub rejection_reason: Option<String>,
    pub completed_at: Option<Timestamp>,

    pub current_pic_user_id: Option<DbId>,
    pub current_handover_id: Option<DbId>,
    pub handover_status: String,

    pub is_received: bool,
    pub received_at: Option<Timestamp>,
    pub received_by_user_id: Option<DbId>,

    pub is_returned: bool,
    pub returned_at: Option<Timestamp>,
    pub returned_by_user_id: Option<DbId>,
    pub is_rejected_return: bool,

    pub requested_by_user_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// DTO for creating a new case-note request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCaseNoteRequest {
    pub patient_id: DbId,
    pub department_id: DbId,
    pub doctor_id: Option<DbId>,
    pub location_id: Option<DbId>,
    pub priority: String,
    #[validate(length(max = 500))]
    pub purpose: Option<String>,
    pub needed_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
}

/// Per-status member count row for a batch roll-up query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}
