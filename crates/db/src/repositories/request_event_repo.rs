//! Repository for the append-only `request_events` table (CNT-06).
//!
//! `append` is the only write operation; no update or delete method exists
//! and none may be added.

use sqlx::PgExecutor;

use casetrack_core::types::DbId;

use crate::models::request_event::{CreateRequestEvent, RequestEvent};

/// Column list for request_events queries.
const EVENT_COLUMNS: &str = "id, case_note_request_id, event_type, actor_user_id, \
    to_location_id, to_person, reason, metadata, occurred_at";

/// Provides append and read operations for the audit log.
pub struct RequestEventRepo;

impl RequestEventRepo {
    /// Append an audit event, returning the created row.
    pub async fn append(
        executor: impl PgExecutor<'_>,
        input: &CreateRequestEvent,
    ) -> Result<RequestEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO request_events
                (case_note_request_id, event_type, actor_user_id,
                 to_location_id, to_person, reason, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, RequestEvent>(&query)
            .bind(input.case_note_request_id)
            .bind(&input.event_type)
            .bind(input.actor_user_id)
            .bind(input.to_location_id)
            .bind(&input.to_person)
            .bind(&input.reason)
            .bind(&input.metadata)
            .fetch_one(executor)
            .await
    }

    /// A request's event timeline, ordered by `occurred_at` ascending,
    /// paginated.
    pub async fn list_for_request(
        executor: impl PgExecutor<'_>,
        case_note_request_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RequestEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM request_events
             WHERE case_note_request_id = $1
             ORDER BY occurred_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, RequestEvent>(&query)
            .bind(case_note_request_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Total number of events for a request.
    pub async fn count_for_request(
        executor: impl PgExecutor<'_>,
        case_note_request_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM request_events WHERE case_note_request_id = $1")
            .bind(case_note_request_id)
            .fetch_one(executor)
            .await
    }
}
