//! Audit event entity model (CNT-06).
//!
//! Immutable records — no `updated_at`, and no update DTO exists. The event
//! timeline is the sole source of truth for what happened to a request and
//! when.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the append-only `request_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestEvent {
    pub id: DbId,
    pub case_note_request_id: DbId,
    pub event_type: String,
    pub actor_user_id: DbId,
    pub to_location_id: Option<DbId>,
    pub to_person: Option<String>,
    pub reason: Option<String>,
    pub metadata: serde_json::Value,
    pub occurred_at: Timestamp,
}

/// DTO for appending an audit event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestEvent {
    pub case_note_request_id: DbId,
    pub event_type: String,
    pub actor_user_id: DbId,
    pub to_location_id: Option<DbId>,
    pub to_person: Option<String>,
    pub reason: Option<String>,
    pub metadata: serde_json::Value,
}

impl CreateRequestEvent {
    /// Minimal event: type + request + actor, empty metadata.
    pub fn new(case_note_request_id: DbId, event_type: &str, actor_user_id: DbId) -> Self {
        Self {
            case_note_request_id,
            event_type: event_type.to_string(),
            actor_user_id,
            to_location_id: None,
            to_person: None,
            reason: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
