//! Repository for the `case_note_requests` table (CNT-02).

use sqlx::PgExecutor;

use casetrack_core::types::DbId;

use crate::models::request::{CaseNoteRequest, CreateCaseNoteRequest, StatusCount};

/// Column list for case_note_requests queries.
const REQUEST_COLUMNS: &str = "id, request_number, patient_id, department_id, doctor_id, \
    location_id, batch_id, priority, purpose, needed_date, remarks, \
    status, approved_at, approved_by_user_id, rejected_at, rejected_by_user_id, \
    rejection_reason, completed_at, \
    current_pic_user_id, current_handover_id, handover_status, \
    is_received, received_at, received_by_user_id, \
    is_returned, returned_at, returned_by_user_id, is_rejected_return, \
    requested_by_user_id, created_at, updated_at, deleted_at";

/// Provides persistence operations for case-note requests.
///
/// Mutating methods are unconditional by id: the engine locks the row and
/// checks preconditions before calling them, all inside one transaction.
pub struct RequestRepo;

impl RequestRepo {
    /// Insert a new request, returning the created row.
    ///
    /// The requester starts as the current PIC; status and handover status
    /// take their column defaults (`pending` / `none`).
    pub async fn create(
        executor: impl PgExecutor<'_>,
        request_number: &str,
        input: &CreateCaseNoteRequest,
        requested_by_user_id: DbId,
        batch_id: Option<DbId>,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_note_requests
                (request_number, patient_id, department_id, doctor_id, location_id,
                 batch_id, priority, purpose, needed_date, remarks,
                 requested_by_user_id, current_pic_user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(request_number)
            .bind(input.patient_id)
            .bind(input.department_id)
            .bind(input.doctor_id)
            .bind(input.location_id)
            .bind(batch_id)
            .bind(&input.priority)
            .bind(&input.purpose)
            .bind(input.needed_date)
            .bind(&input.remarks)
            .bind(requested_by_user_id)
            .fetch_one(executor)
            .await
    }

    /// Find a request by id. Soft-deleted rows are hidden.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<CaseNoteRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM case_note_requests
             WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a request by id, taking a row lock for the enclosing transaction.
    pub async fn lock_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<CaseNoteRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM case_note_requests
             WHERE id = $1 AND deleted_at IS NULL
             FOR UPDATE"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Record an approval decision.
    pub async fn approve(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        approved_by_user_id: DbId,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET status = $2, approved_at = now(), approved_by_user_id = $3,
                 updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(approved_by_user_id)
            .fetch_one(executor)
            .await
    }

    /// Record a rejection decision with its mandatory reason.
    pub async fn reject(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        rejected_by_user_id: DbId,
        reason: &str,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET status = $2, rejected_at = now(), rejected_by_user_id = $3,
                 rejection_reason = $4, updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(rejected_by_user_id)
            .bind(reason)
            .fetch_one(executor)
            .await
    }

    /// Record physical receipt of the case note by the requester.
    pub async fn mark_received(
        executor: impl PgExecutor<'_>,
        id: DbId,
        received_by_user_id: DbId,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET is_received = TRUE, received_at = now(),
                 received_by_user_id = $2, updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(received_by_user_id)
            .fetch_one(executor)
            .await
    }

    /// Close out a request.
    pub async fn complete(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET status = $2, completed_at = now(), updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await
    }

    /// Record the holder returning the note, entering return verification.
    pub async fn mark_returned(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        returned_by_user_id: DbId,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET is_returned = TRUE, returned_at = now(),
                 returned_by_user_id = $3, status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(returned_by_user_id)
            .fetch_one(executor)
            .await
    }

    /// Accept a verified return: close the record and clear custody.
    pub async fn close_return_accepted(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        handover_status: &str,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET status = $2, completed_at = COALESCE(completed_at, now()),
                 current_pic_user_id = NULL, current_handover_id = NULL,
                 handover_status = $3, updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(handover_status)
            .fetch_one(executor)
            .await
    }

    /// Reject a return during verification.
    pub async fn close_return_rejected(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        rejected_by_user_id: DbId,
        reason: Option<&str>,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET status = $2, is_rejected_return = TRUE,
                 rejected_at = now(), rejected_by_user_id = $3,
                 rejection_reason = COALESCE($4, rejection_reason),
                 updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(rejected_by_user_id)
            .bind(reason)
            .fetch_one(executor)
            .await
    }

    /// Point the request at an in-flight handover row.
    pub async fn set_handover_pointer(
        executor: impl PgExecutor<'_>,
        id: DbId,
        handover_id: DbId,
        handover_status: &str,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET current_handover_id = $2, handover_status = $3, updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(handover_id)
            .bind(handover_status)
            .fetch_one(executor)
            .await
    }

    /// Update the handover dimension without touching custody.
    pub async fn set_handover_status(
        executor: impl PgExecutor<'_>,
        id: DbId,
        handover_status: &str,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET handover_status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(handover_status)
            .fetch_one(executor)
            .await
    }

    /// Move custody to a new holder.
    ///
    /// The only writers of `current_pic_user_id` after creation are the two
    /// terminal handover steps, both of which go through here.
    pub async fn transfer_custody(
        executor: impl PgExecutor<'_>,
        id: DbId,
        to_user_id: DbId,
        handover_status: &str,
        status: &str,
    ) -> Result<CaseNoteRequest, sqlx::Error> {
        let query = format!(
            "UPDATE case_note_requests
             SET current_pic_user_id = $2, handover_status = $3, status = $4,
                 updated_at = now()
             WHERE id = $1
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(id)
            .bind(to_user_id)
            .bind(handover_status)
            .bind(status)
            .fetch_one(executor)
            .await
    }

    /// List a batch's member requests, oldest first.
    pub async fn list_by_batch(
        executor: impl PgExecutor<'_>,
        batch_id: DbId,
    ) -> Result<Vec<CaseNoteRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM case_note_requests
             WHERE batch_id = $1 AND deleted_at IS NULL
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, CaseNoteRequest>(&query)
            .bind(batch_id)
            .fetch_all(executor)
            .await
    }

    /// Per-status member counts for a batch, computed from live rows.
    pub async fn status_counts_for_batch(
        executor: impl PgExecutor<'_>,
        batch_id: DbId,
    ) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM case_note_requests
             WHERE batch_id = $1 AND deleted_at IS NULL
             GROUP BY status",
        )
        .bind(batch_id)
        .fetch_all(executor)
        .await
    }

    /// Number of batch members already received.
    pub async fn count_received_in_batch(
        executor: impl PgExecutor<'_>,
        batch_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM case_note_requests
             WHERE batch_id = $1 AND deleted_at IS NULL AND is_received = TRUE",
        )
        .bind(batch_id)
        .fetch_one(executor)
        .await
    }
}
