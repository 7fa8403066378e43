//! Handover status vocabularies and the acknowledgement SLA (CNT-04).
//!
//! Three related vocabularies live here:
//!
//! - the request-side `handover_status` field (custody dimension of the
//!   aggregate),
//! - the `handovers` record status (one custody transfer),
//! - the `handover_requests` record status (the mediated pull flow).
//!
//! Custody itself (`current_pic_user_id`) is written only by the two
//! terminal steps: direct-handover acknowledgement and mediated-request
//! verification.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Request-side handover status
// ---------------------------------------------------------------------------

/// No transfer in flight.
pub const HANDOVER_NONE: &str = "none";

/// A direct handover has been initiated and awaits MR acknowledgement.
pub const HANDOVER_PENDING: &str = "pending";

/// Transfer paperwork is being processed.
pub const HANDOVER_IN_PROGRESS: &str = "in_progress";

/// Direct handover acknowledged; custody has moved.
pub const HANDOVER_COMPLETED: &str = "completed";

/// Custody moved and the new holder confirmed physical receipt.
pub const HANDOVER_TRANSFERRED: &str = "transferred";

/// A mediated handover request was approved by the holder; custody has NOT
/// moved yet.
pub const HANDOVER_APPROVED_PENDING_VERIFICATION: &str = "approved_pending_verification";

/// Mediated transfer verified; custody has moved.
pub const HANDOVER_VERIFIED: &str = "verified";

/// The in-flight transfer was rejected.
pub const HANDOVER_REJECTED: &str = "rejected";

/// All valid request-side handover status values.
pub const VALID_HANDOVER_STATUSES: &[&str] = &[
    HANDOVER_NONE,
    HANDOVER_PENDING,
    HANDOVER_IN_PROGRESS,
    HANDOVER_COMPLETED,
    HANDOVER_TRANSFERRED,
    HANDOVER_APPROVED_PENDING_VERIFICATION,
    HANDOVER_VERIFIED,
    HANDOVER_REJECTED,
];

/// Handover statuses that block initiating another direct handover.
pub const HANDOVER_BLOCKING: &[&str] = &[HANDOVER_PENDING, HANDOVER_IN_PROGRESS];

// ---------------------------------------------------------------------------
// Handover record status
// ---------------------------------------------------------------------------

/// Transfer recorded, awaiting MR paperwork acknowledgement.
pub const RECORD_PENDING: &str = "pending";

/// MR staff acknowledged the paperwork; custody moved.
pub const RECORD_ACKNOWLEDGED: &str = "acknowledged";

/// The receiving holder confirmed physical receipt.
pub const RECORD_COMPLETED: &str = "completed";

/// All valid handover record status values.
pub const VALID_RECORD_STATUSES: &[&str] =
    &[RECORD_PENDING, RECORD_ACKNOWLEDGED, RECORD_COMPLETED];

// ---------------------------------------------------------------------------
// Handover request (mediated flow) status
// ---------------------------------------------------------------------------

/// Proposal created, awaiting the current holder's response.
pub const REQUEST_PENDING: &str = "pending";

/// Approved by the holder but physical transfer not yet verified.
pub const REQUEST_APPROVED_PENDING_VERIFICATION: &str = "approved_pending_verification";

/// Approved (legacy alias rows only; new approvals go straight to
/// `approved_pending_verification`).
pub const REQUEST_APPROVED: &str = "approved";

/// Rejected by the holder. Terminal.
pub const REQUEST_REJECTED: &str = "rejected";

/// Physical transfer verified; custody moved. Terminal.
pub const REQUEST_VERIFIED: &str = "verified";

/// All valid handover request status values.
pub const VALID_REQUEST_STATUSES: &[&str] = &[
    REQUEST_PENDING,
    REQUEST_APPROVED,
    REQUEST_REJECTED,
    REQUEST_APPROVED_PENDING_VERIFICATION,
    REQUEST_VERIFIED,
];

/// Handover-request statuses that count as in-flight: at most one of these
/// may exist per case note at a time.
pub const REQUEST_IN_FLIGHT_STATUSES: &[&str] =
    &[REQUEST_PENDING, REQUEST_APPROVED_PENDING_VERIFICATION];

// ---------------------------------------------------------------------------
// Acknowledgement SLA
// ---------------------------------------------------------------------------

/// A pending handover must be acknowledged within this window.
pub const ACK_SLA_HOURS: i64 = 6;

/// Escalation fires this long after a handover goes overdue.
pub const ESCALATION_AFTER_HOURS: i64 = 2;

/// The instant a pending handover becomes overdue.
pub fn ack_deadline(handed_over_at: Timestamp) -> Timestamp {
    handed_over_at + Duration::hours(ACK_SLA_HOURS)
}

/// Whether an unacknowledged handover has breached the SLA at `now`.
pub fn is_ack_overdue(handed_over_at: Timestamp, now: Timestamp) -> bool {
    now >= ack_deadline(handed_over_at)
}

/// Whether an overdue handover is due for escalation at `now`.
pub fn is_escalation_due(overdue_at: Timestamp, now: Timestamp) -> bool {
    now >= overdue_at + Duration::hours(ESCALATION_AFTER_HOURS)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a request-side handover status string.
pub fn validate_handover_status(status: &str) -> Result<(), CoreError> {
    if VALID_HANDOVER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid handover status '{status}'. Must be one of: {}",
            VALID_HANDOVER_STATUSES.join(", ")
        )))
    }
}

/// Whether a handover status blocks a new direct handover.
pub fn blocks_new_handover(status: &str) -> bool {
    HANDOVER_BLOCKING.contains(&status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
