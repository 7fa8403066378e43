//! Repository for the `handover_requests` table (CNT-05).

use sqlx::PgExecutor;

use casetrack_core::types::DbId;

use crate::models::handover_request::{CreateHandoverRequest, HandoverRequest};

/// Column list for handover_requests queries.
const HANDOVER_REQUEST_COLUMNS: &str = "id, case_note_request_id, requested_by_user_id, \
    current_holder_user_id, reason, priority, department_id, location_id, doctor_id, \
    status, requested_at, responded_at, response_notes, verified_at, \
    verified_by_user_id, verification_notes, created_at, updated_at";

/// Provides persistence operations for mediated handover requests.
pub struct HandoverRequestRepo;

impl HandoverRequestRepo {
    /// Insert a new mediated handover request (status defaults to `pending`).
    pub async fn create(
        executor: impl PgExecutor<'_>,
        case_note_request_id: DbId,
        requested_by_user_id: DbId,
        current_holder_user_id: DbId,
        input: &CreateHandoverRequest,
    ) -> Result<HandoverRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO handover_requests
                (case_note_request_id, requested_by_user_id, current_holder_user_id,
                 reason, priority, department_id, location_id, doctor_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {HANDOVER_REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(case_note_request_id)
            .bind(requested_by_user_id)
            .bind(current_holder_user_id)
            .bind(&input.reason)
            .bind(&input.priority)
            .bind(input.department_id)
            .bind(input.location_id)
            .bind(input.doctor_id)
            .fetch_one(executor)
            .await
    }

    /// Find a handover request by id.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<HandoverRequest>, sqlx::Error> {
        let query =
            format!("SELECT {HANDOVER_REQUEST_COLUMNS} FROM handover_requests WHERE id = $1");
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a handover request by id, taking a row lock.
    pub async fn lock_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<HandoverRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {HANDOVER_REQUEST_COLUMNS} FROM handover_requests WHERE id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find the in-flight (pending or approved-pending-verification)
    /// handover request for a case note, if any.
    pub async fn find_in_flight_for_request(
        executor: impl PgExecutor<'_>,
        case_note_request_id: DbId,
        in_flight_statuses: &[&str],
    ) -> Result<Option<HandoverRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {HANDOVER_REQUEST_COLUMNS} FROM handover_requests
             WHERE case_note_request_id = $1 AND status = ANY($2)
             ORDER BY requested_at DESC
             LIMIT 1"
        );
        let statuses: Vec<String> = in_flight_statuses.iter().map(|s| s.to_string()).collect();
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(case_note_request_id)
            .bind(statuses)
            .fetch_optional(executor)
            .await
    }

    /// Record the holder's response (approve or reject).
    pub async fn respond(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        response_notes: Option<&str>,
    ) -> Result<HandoverRequest, sqlx::Error> {
        let query = format!(
            "UPDATE handover_requests
             SET status = $2, responded_at = now(), response_notes = $3,
                 updated_at = now()
             WHERE id = $1
             RETURNING {HANDOVER_REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(response_notes)
            .fetch_one(executor)
            .await
    }

    /// Record physical-transfer verification.
    pub async fn verify(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: &str,
        verified_by_user_id: DbId,
        verification_notes: Option<&str>,
    ) -> Result<HandoverRequest, sqlx::Error> {
        let query = format!(
            "UPDATE handover_requests
             SET status = $2, verified_at = now(), verified_by_user_id = $3,
                 verification_notes = $4, updated_at = now()
             WHERE id = $1
             RETURNING {HANDOVER_REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(verified_by_user_id)
            .bind(verification_notes)
            .fetch_one(executor)
            .await
    }

    /// List pending handover requests awaiting a given holder's response,
    /// oldest first.
    pub async fn list_pending_for_holder(
        executor: impl PgExecutor<'_>,
        holder_user_id: DbId,
        pending_status: &str,
    ) -> Result<Vec<HandoverRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {HANDOVER_REQUEST_COLUMNS} FROM handover_requests
             WHERE current_holder_user_id = $1 AND status = $2
             ORDER BY requested_at ASC"
        );
        sqlx::query_as::<_, HandoverRequest>(&query)
            .bind(holder_user_id)
            .bind(pending_status)
            .fetch_all(executor)
            .await
    }
}
