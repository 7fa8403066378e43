//! Request status and priority vocabularies with transition rules (CNT-02).
//!
//! Approval status and handover status are two independent state machines on
//! the same aggregate; this module owns the approval dimension. The handover
//! dimension lives in [`crate::handover`], and the cross-machine invariant
//! check in the engine runs both inside every transaction.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Request status constants
// ---------------------------------------------------------------------------

/// Submitted, awaiting an MR decision.
pub const STATUS_PENDING: &str = "pending";

/// Approved by MR; the physical note may now be retrieved.
pub const STATUS_APPROVED: &str = "approved";

/// The note is circulating between ward holders.
pub const STATUS_IN_PROGRESS: &str = "in_progress";

/// Closed out. Terminal, except for the return-verification re-open.
pub const STATUS_COMPLETED: &str = "completed";

/// Rejected by MR. Terminal.
pub const STATUS_REJECTED: &str = "rejected";

/// The holder returned the note; MR must verify the physical return.
pub const STATUS_PENDING_RETURN_VERIFICATION: &str = "pending_return_verification";

/// All valid request status values.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_APPROVED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_REJECTED,
    STATUS_PENDING_RETURN_VERIFICATION,
];

// ---------------------------------------------------------------------------
// Priority constants
// ---------------------------------------------------------------------------

pub const PRIORITY_LOW: &str = "low";
pub const PRIORITY_NORMAL: &str = "normal";
pub const PRIORITY_HIGH: &str = "high";
pub const PRIORITY_URGENT: &str = "urgent";

/// All valid priority values.
pub const VALID_PRIORITIES: &[&str] =
    &[PRIORITY_LOW, PRIORITY_NORMAL, PRIORITY_HIGH, PRIORITY_URGENT];

// ---------------------------------------------------------------------------
// Transition rules
// ---------------------------------------------------------------------------

/// Whether a status is terminal.
///
/// `completed` is terminal for the approval machine itself; the explicit
/// return path re-opens it to `pending_return_verification`, which
/// [`can_transition`] permits.
pub fn is_terminal(status: &str) -> bool {
    status == STATUS_COMPLETED || status == STATUS_REJECTED
}

/// One-directional transition table for the approval status machine.
///
/// `rejected` is reachable from the receivable states through the
/// rejected-not-received path, and from return verification. The single
/// backward edge is the documented return re-open
/// (`completed -> pending_return_verification`).
pub fn can_transition(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        (STATUS_PENDING, STATUS_APPROVED)
            | (STATUS_PENDING, STATUS_REJECTED)
            | (STATUS_APPROVED, STATUS_IN_PROGRESS)
            | (STATUS_APPROVED, STATUS_COMPLETED)
            | (STATUS_APPROVED, STATUS_REJECTED)
            | (STATUS_APPROVED, STATUS_PENDING_RETURN_VERIFICATION)
            | (STATUS_IN_PROGRESS, STATUS_COMPLETED)
            | (STATUS_IN_PROGRESS, STATUS_REJECTED)
            | (STATUS_IN_PROGRESS, STATUS_PENDING_RETURN_VERIFICATION)
            | (STATUS_COMPLETED, STATUS_PENDING_RETURN_VERIFICATION)
            | (STATUS_PENDING_RETURN_VERIFICATION, STATUS_COMPLETED)
            | (STATUS_PENDING_RETURN_VERIFICATION, STATUS_REJECTED)
            | (STATUS_PENDING_RETURN_VERIFICATION, STATUS_IN_PROGRESS)
    )
}

/// Validate that a status string is one of the accepted values.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid request status '{status}'. Must be one of: {}",
            VALID_STATUSES.join(", ")
        )))
    }
}

/// Validate that a priority string is one of the accepted values.
pub fn validate_priority(priority: &str) -> Result<(), CoreError> {
    if VALID_PRIORITIES.contains(&priority) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid priority '{priority}'. Must be one of: {}",
            VALID_PRIORITIES.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_splits_to_approved_or_rejected() {
        assert!(can_transition(STATUS_PENDING, STATUS_APPROVED));
        assert!(can_transition(STATUS_PENDING, STATUS_REJECTED));
        assert!(!can_transition(STATUS_PENDING, STATUS_COMPLETED));
        assert!(!can_transition(STATUS_PENDING, STATUS_IN_PROGRESS));
    }

    #[test]
    fn rejected_is_a_dead_end() {
        for to in VALID_STATUSES {
            assert!(!can_transition(STATUS_REJECTED, to), "rejected -> {to}");
        }
    }

    #[test]
    fn completed_reopens_only_for_return_verification() {
        assert!(can_transition(STATUS_COMPLETED, STATUS_PENDING_RETURN_VERIFICATION));
        assert!(!can_transition(STATUS_COMPLETED, STATUS_APPROVED));
        assert!(!can_transition(STATUS_COMPLETED, STATUS_PENDING));
        assert!(!can_transition(STATUS_COMPLETED, STATUS_REJECTED));
    }

    #[test]
    fn return_verification_resolves_both_ways() {
        assert!(can_transition(STATUS_PENDING_RETURN_VERIFICATION, STATUS_COMPLETED));
        assert!(can_transition(STATUS_PENDING_RETURN_VERIFICATION, STATUS_REJECTED));
    }

    #[test]
    fn no_self_transitions() {
        for s in VALID_STATUSES {
            assert!(!can_transition(s, s), "{s} -> {s} should not be allowed");
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal(STATUS_COMPLETED));
        assert!(is_terminal(STATUS_REJECTED));
        assert!(!is_terminal(STATUS_PENDING));
        assert!(!is_terminal(STATUS_PENDING_RETURN_VERIFICATION));
    }

    #[test]
    fn unknown_status_rejected() {
        let err = validate_status("bogus").unwrap_err();
        assert!(err.to_string().contains("Invalid request status"));
    }

    #[test]
    fn all_priorities_accepted() {
        for p in VALID_PRIORITIES {
            assert!(validate_priority(p).is_ok());
        }
        assert!(validate_priority("asap").is_err());
    }
}
