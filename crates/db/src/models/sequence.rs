//! Daily sequence counter model (CNT-01).

use serde::Serialize;
use sqlx::FromRow;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `request_sequences` table: one counter per calendar day.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestSequence {
    pub id: DbId,
    pub date_key: String,
    pub current_sequence: i32,
    pub updated_at: Timestamp,
}
