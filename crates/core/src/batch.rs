//! Batch roll-up math and derived status (CNT-08).
//!
//! Batch status is never an independently settable field: it is a pure
//! function of the member request statuses, recomputed from live rows on
//! every read. Only the receipt roll-up (`received_count`, `is_verified`)
//! is materialized on the batch row, and the engine recomputes it in the
//! same transaction as the receipts it reflects.

use serde::Serialize;

use crate::status;

// ---------------------------------------------------------------------------
// Derived batch status constants
// ---------------------------------------------------------------------------

/// No member has been resolved yet.
pub const BATCH_PENDING: &str = "pending";

/// Every member was approved.
pub const BATCH_APPROVED: &str = "approved";

/// Every member was rejected.
pub const BATCH_REJECTED: &str = "rejected";

/// Members split between approved, rejected, and/or still pending.
pub const BATCH_PARTIALLY_APPROVED: &str = "partially_approved";

// ---------------------------------------------------------------------------
// Member counts
// ---------------------------------------------------------------------------

/// Live counts over a batch's member requests.
///
/// Invariant: `pending + approved + rejected == total` at every point in
/// time. "Approved" counts any member at-or-beyond approval (`approved`,
/// `in_progress`, `completed`, `pending_return_verification`) — a member
/// does not stop counting as approved once it starts circulating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemberCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

impl MemberCounts {
    /// Classify a list of member statuses into roll-up counts.
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = Self::default();
        for s in statuses {
            counts.total += 1;
            match s {
                status::STATUS_PENDING => counts.pending += 1,
                status::STATUS_REJECTED => counts.rejected += 1,
                _ => counts.approved += 1,
            }
        }
        counts
    }

    /// Build counts from `(status, count)` pairs, as returned by a
    /// `GROUP BY status` roll-up query.
    pub fn from_status_counts<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut counts = Self::default();
        for (s, n) in pairs {
            counts.total += n;
            match s {
                status::STATUS_PENDING => counts.pending += n,
                status::STATUS_REJECTED => counts.rejected += n,
                _ => counts.approved += n,
            }
        }
        counts
    }

    /// Whether every member has been resolved one way or the other.
    pub fn is_fully_resolved(&self) -> bool {
        self.pending == 0
    }
}

// ---------------------------------------------------------------------------
// Derived status
// ---------------------------------------------------------------------------

/// Derive the batch status from member counts.
///
/// - `pending` while no member has been resolved,
/// - `approved` iff all members approved,
/// - `rejected` iff all members rejected,
/// - `partially_approved` for any mix.
pub fn derive_status(counts: MemberCounts) -> &'static str {
    if counts.total == 0 || counts.pending == counts.total {
        BATCH_PENDING
    } else if counts.approved == counts.total {
        BATCH_APPROVED
    } else if counts.rejected == counts.total {
        BATCH_REJECTED
    } else {
        BATCH_PARTIALLY_APPROVED
    }
}

/// Whether a batch's receipt verification is complete: every approved
/// member individually received, and there is at least one.
pub fn is_receipt_verified(counts: MemberCounts, received_count: i64) -> bool {
    counts.approved > 0 && received_count >= counts.approved
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::*;

    #[test]
    fn counts_partition_members() {
        let counts = MemberCounts::from_statuses([
            STATUS_PENDING,
            STATUS_APPROVED,
            STATUS_IN_PROGRESS,
            STATUS_COMPLETED,
            STATUS_REJECTED,
            STATUS_PENDING_RETURN_VERIFICATION,
        ]);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.approved, 4);
        assert_eq!(counts.rejected, 1);
        assert_eq!(counts.pending + counts.approved + counts.rejected, counts.total);
    }

    #[test]
    fn grouped_counts_match_itemized_counts() {
        let itemized =
            MemberCounts::from_statuses([STATUS_PENDING, STATUS_APPROVED, STATUS_APPROVED]);
        let grouped =
            MemberCounts::from_status_counts([(STATUS_PENDING, 1), (STATUS_APPROVED, 2)]);
        assert_eq!(itemized, grouped);
    }

    #[test]
    fn empty_batch_is_pending() {
        assert_eq!(derive_status(MemberCounts::default()), BATCH_PENDING);
    }

    #[test]
    fn all_pending_is_pending() {
        let counts = MemberCounts::from_statuses([STATUS_PENDING, STATUS_PENDING]);
        assert_eq!(derive_status(counts), BATCH_PENDING);
    }

    #[test]
    fn all_approved_is_approved() {
        let counts = MemberCounts::from_statuses([STATUS_APPROVED, STATUS_COMPLETED]);
        assert_eq!(derive_status(counts), BATCH_APPROVED);
    }

    #[test]
    fn all_rejected_is_rejected() {
        let counts = MemberCounts::from_statuses([STATUS_REJECTED, STATUS_REJECTED]);
        assert_eq!(derive_status(counts), BATCH_REJECTED);
    }

    #[test]
    fn two_approved_one_rejected_is_partially_approved() {
        let counts =
            MemberCounts::from_statuses([STATUS_APPROVED, STATUS_APPROVED, STATUS_REJECTED]);
        assert_eq!(derive_status(counts), BATCH_PARTIALLY_APPROVED);
    }

    #[test]
    fn approved_with_pending_remainder_is_partially_approved() {
        let counts = MemberCounts::from_statuses([STATUS_APPROVED, STATUS_PENDING]);
        assert_eq!(derive_status(counts), BATCH_PARTIALLY_APPROVED);
    }

    #[test]
    fn receipt_verification_requires_all_approved_received() {
        let counts =
            MemberCounts::from_statuses([STATUS_APPROVED, STATUS_APPROVED, STATUS_REJECTED]);
        assert!(!is_receipt_verified(counts, 1));
        assert!(is_receipt_verified(counts, 2));
    }

    #[test]
    fn receipt_verification_needs_at_least_one_approved() {
        let counts = MemberCounts::from_statuses([STATUS_REJECTED]);
        assert!(!is_receipt_verified(counts, 0));
    }
}
