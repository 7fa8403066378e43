//! Audit event-type registry (CNT-06).
//!
//! Event types are an open string-backed set validated against this
//! registry, not a database enum: adding a new kind is a one-line change
//! here with no schema migration. The `request_events.event_type` column is
//! plain TEXT.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Event type constants
// ---------------------------------------------------------------------------

pub const EVENT_CREATED: &str = "created";
pub const EVENT_SUBMITTED: &str = "submitted";
pub const EVENT_APPROVED: &str = "approved";
pub const EVENT_REJECTED: &str = "rejected";
pub const EVENT_IN_PROGRESS: &str = "in_progress";
pub const EVENT_HANDED_OVER: &str = "handed_over";
pub const EVENT_RECEIVED: &str = "received";
pub const EVENT_COMPLETED: &str = "completed";
pub const EVENT_RETURNED: &str = "returned";
pub const EVENT_HANDOVER_REQUESTED: &str = "handover_requested";
pub const EVENT_HANDOVER_APPROVED: &str = "handover_approved";
pub const EVENT_HANDOVER_REJECTED: &str = "handover_rejected";
pub const EVENT_REJECTED_NOT_RECEIVED: &str = "rejected_not_received";
pub const EVENT_RETURNED_VERIFIED: &str = "returned_verified";
pub const EVENT_RETURNED_REJECTED: &str = "returned_rejected";
pub const EVENT_HANDOVER_DATA_FIXED: &str = "handover_data_fixed";
pub const EVENT_HANDOVER_VERIFIED: &str = "handover_verified";
pub const EVENT_VERIFIED_RECEIVED: &str = "verified_received";
pub const EVENT_FILING_SUBMITTED: &str = "filing_submitted";
pub const EVENT_FILING_APPROVED: &str = "filing_approved";
pub const EVENT_FILING_REJECTED: &str = "filing_rejected";
pub const EVENT_SENT_OUT: &str = "sent_out";
pub const EVENT_ACKNOWLEDGED_RECEIVED: &str = "acknowledged_received";

/// Every event type the registry currently recognizes.
pub const REGISTERED_EVENT_TYPES: &[&str] = &[
    EVENT_CREATED,
    EVENT_SUBMITTED,
    EVENT_APPROVED,
    EVENT_REJECTED,
    EVENT_IN_PROGRESS,
    EVENT_HANDED_OVER,
    EVENT_RECEIVED,
    EVENT_COMPLETED,
    EVENT_RETURNED,
    EVENT_HANDOVER_REQUESTED,
    EVENT_HANDOVER_APPROVED,
    EVENT_HANDOVER_REJECTED,
    EVENT_REJECTED_NOT_RECEIVED,
    EVENT_RETURNED_VERIFIED,
    EVENT_RETURNED_REJECTED,
    EVENT_HANDOVER_DATA_FIXED,
    EVENT_HANDOVER_VERIFIED,
    EVENT_VERIFIED_RECEIVED,
    EVENT_FILING_SUBMITTED,
    EVENT_FILING_APPROVED,
    EVENT_FILING_REJECTED,
    EVENT_SENT_OUT,
    EVENT_ACKNOWLEDGED_RECEIVED,
];

/// Whether an event type name is known to the registry.
pub fn is_registered(event_type: &str) -> bool {
    REGISTERED_EVENT_TYPES.contains(&event_type)
}

/// Validate an event type name before it is written to the audit log.
pub fn validate_event_type(event_type: &str) -> Result<(), CoreError> {
    if is_registered(event_type) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unregistered audit event type '{event_type}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Metadata keys
// ---------------------------------------------------------------------------

/// Well-known keys inside `request_events.metadata`.
///
/// The replay projection reads these; the engine writes them. Keeping the
/// names here stops the two from drifting apart.
pub mod metadata_keys {
    /// New custodian after a custody-moving event (i64).
    pub const TO_USER_ID: &str = "to_user_id";
    /// Request-side handover status resulting from the event (string).
    pub const HANDOVER_STATUS: &str = "handover_status";
    /// Handover or handover-request row the event refers to (i64).
    pub const HANDOVER_ID: &str = "handover_id";
    pub const HANDOVER_REQUEST_ID: &str = "handover_request_id";
    /// Batch the request was created under (i64).
    pub const BATCH_ID: &str = "batch_id";
    /// Free-form operator notes (string).
    pub const NOTES: &str = "notes";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_no_duplicates() {
        let mut sorted: Vec<&str> = REGISTERED_EVENT_TYPES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), REGISTERED_EVENT_TYPES.len());
    }

    #[test]
    fn lifecycle_types_are_registered() {
        for t in [
            EVENT_CREATED,
            EVENT_APPROVED,
            EVENT_RECEIVED,
            EVENT_HANDED_OVER,
            EVENT_HANDOVER_VERIFIED,
            EVENT_RETURNED_VERIFIED,
        ] {
            assert!(is_registered(t), "{t} should be registered");
        }
    }

    #[test]
    fn unknown_type_fails_validation() {
        let err = validate_event_type("shredded").unwrap_err();
        assert!(err.to_string().contains("Unregistered"));
    }
}
