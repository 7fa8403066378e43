//! Batch entity model and DTOs (CNT-08).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `batches` table.
///
/// Only the receipt roll-up is materialized here; batch status and the
/// pending/approved/rejected counts are derived from member rows on read.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub id: DbId,
    pub batch_number: String,
    pub requested_by_user_id: DbId,
    pub department_id: DbId,
    pub priority: String,
    pub purpose: Option<String>,
    pub needed_date: Option<NaiveDate>,
    pub received_count: i32,
    pub is_verified: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a batch of case-note requests in one submission.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatch {
    #[validate(length(min = 1, max = 200))]
    pub patient_ids: Vec<DbId>,
    pub department_id: DbId,
    pub doctor_id: Option<DbId>,
    pub location_id: Option<DbId>,
    pub priority: String,
    #[validate(length(max = 500))]
    pub purpose: Option<String>,
    pub needed_date: Option<NaiveDate>,
}
