//! Handover (custody transfer) entity model and DTOs (CNT-04).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `handovers` table: one custody transfer.
///
/// Backs both protocols — the direct flow inserts it at initiate; the
/// mediated flow materializes it at holder approval with
/// `handover_request_id` set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Handover {
    pub id: DbId,
    pub case_note_request_id: DbId,
    pub handover_request_id: Option<DbId>,
    pub handed_over_by_user_id: DbId,
    pub handed_over_to_user_id: DbId,
    pub department_id: DbId,
    pub location_id: Option<DbId>,
    pub handover_doctor_id: Option<DbId>,
    pub handover_reason: Option<String>,
    pub status: String,
    pub handed_over_at: Timestamp,
    pub verified_at: Option<Timestamp>,
    pub receipt_confirmed_at: Option<Timestamp>,
    pub overdue_at: Option<Timestamp>,
    pub reminder_sent_at: Option<Timestamp>,
    pub escalation_sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for initiating a direct handover.
///
/// The initiating holder and target case note come from the call context,
/// not the body.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateHandover {
    pub handed_over_to_user_id: DbId,
    pub department_id: DbId,
    pub location_id: Option<DbId>,
    pub handover_doctor_id: Option<DbId>,
    pub handover_reason: Option<String>,
}

/// DTO for inserting a handover row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHandover {
    pub case_note_request_id: DbId,
    pub handover_request_id: Option<DbId>,
    pub handed_over_by_user_id: DbId,
    pub handed_over_to_user_id: DbId,
    pub department_id: DbId,
    pub location_id: Option<DbId>,
    pub handover_doctor_id: Option<DbId>,
    pub handover_reason: Option<String>,
}
