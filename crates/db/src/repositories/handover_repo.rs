//! Repository for the `handovers` table (CNT-04).

use sqlx::PgExecutor;

use casetrack_core::types::{DbId, Timestamp};

use crate::models::handover::{CreateHandover, Handover};

/// Column list for handovers queries.
const HANDOVER_COLUMNS: &str = "id, case_note_request_id, handover_request_id, \
    handed_over_by_user_id, handed_over_to_user_id, department_id, location_id, \
    handover_doctor_id, handover_reason, status, handed_over_at, verified_at, \
    receipt_confirmed_at, overdue_at, reminder_sent_at, escalation_sent_at, \
    created_at, updated_at";

/// Provides persistence operations for custody transfer records.
pub struct HandoverRepo;

impl HandoverRepo {
    /// Insert a new handover row (status defaults to `pending`,
    /// `handed_over_at` to now).
    pub async fn create(
        executor: impl PgExecutor<'_>,
        input: &CreateHandover,
    ) -> Result<Handover, sqlx::Error> {
        let query = format!(
            "INSERT INTO handovers
                (case_note_request_id, handover_request_id, handed_over_by_user_id,
                 handed_over_to_user_id, department_id, location_id,
                 handover_doctor_id, handover_reason)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {HANDOVER_COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(input.case_note_request_id)
            .bind(input.handover_request_id)
            .bind(input.handed_over_by_user_id)
            .bind(input.handed_over_to_user_id)
            .bind(input.department_id)
            .bind(input.location_id)
            .bind(input.handover_doctor_id)
            .bind(&input.handover_reason)
            .fetch_one(executor)
            .await
    }

    /// Find a handover by id.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Handover>, sqlx::Error> {
        let query = format!("SELECT {HANDOVER_COLUMNS} FROM handovers WHERE id = $1");
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a handover by id, taking a row lock for the enclosing transaction.
    pub async fn lock_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Handover>, sqlx::Error> {
        let query = format!("SELECT {HANDOVER_COLUMNS} FROM handovers WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Stamp MR verification (`verified_at`) and advance the record status.
    ///
    /// The direct flow passes `acknowledged`; the mediated flow verifies
    /// paperwork and physical transfer in one step and passes `completed`.
    pub async fn mark_verified(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
    ) -> Result<Handover, sqlx::Error> {
        let query = format!(
            "UPDATE handovers
             SET status = $2, verified_at = now(), updated_at = now()
             WHERE id = $1
             RETURNING {HANDOVER_COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await
    }

    /// Record the receiving holder's physical-receipt confirmation.
    pub async fn confirm_receipt(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
    ) -> Result<Handover, sqlx::Error> {
        let query = format!(
            "UPDATE handovers
             SET status = $2, receipt_confirmed_at = now(), updated_at = now()
             WHERE id = $1
             RETURNING {HANDOVER_COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await
    }

    /// SLA sweep: stamp `overdue_at` on pending handovers handed over at or
    /// before `cutoff`. Returns the ids stamped in this pass.
    pub async fn mark_overdue(
        executor: impl PgExecutor<'_>,
        pending_status: &str,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE handovers
             SET overdue_at = $3, updated_at = now()
             WHERE status = $1 AND overdue_at IS NULL AND handed_over_at <= $2
             RETURNING id",
        )
        .bind(pending_status)
        .bind(cutoff)
        .bind(now)
        .fetch_all(executor)
        .await
    }

    /// SLA sweep: stamp `reminder_sent_at` on overdue handovers that have
    /// not had a reminder yet. Returns the reminder-eligible ids.
    pub async fn stamp_reminders(
        executor: impl PgExecutor<'_>,
        pending_status: &str,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE handovers
             SET reminder_sent_at = $2, updated_at = now()
             WHERE status = $1 AND overdue_at IS NOT NULL AND reminder_sent_at IS NULL
             RETURNING id",
        )
        .bind(pending_status)
        .bind(now)
        .fetch_all(executor)
        .await
    }

    /// SLA sweep: stamp `escalation_sent_at` on handovers overdue since
    /// `escalation_cutoff` or earlier. Returns the escalation-eligible ids.
    pub async fn stamp_escalations(
        executor: impl PgExecutor<'_>,
        pending_status: &str,
        escalation_cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE handovers
             SET escalation_sent_at = $3, updated_at = now()
             WHERE status = $1 AND overdue_at IS NOT NULL AND overdue_at <= $2
               AND escalation_sent_at IS NULL
             RETURNING id",
        )
        .bind(pending_status)
        .bind(escalation_cutoff)
        .bind(now)
        .fetch_all(executor)
        .await
    }
}
