//! Daily sequence allocator (CNT-01).
//!
//! A single atomic upsert per allocation: concurrent callers for the same
//! date key serialize on the row and never see the same value. Numbers are
//! gapless per day as long as the enclosing creation transaction commits;
//! a rolled-back creation rolls the increment back with it.

use sqlx::PgExecutor;

use crate::models::sequence::RequestSequence;

/// Column list for request_sequences queries.
const SEQUENCE_COLUMNS: &str = "id, date_key, current_sequence, updated_at";

/// Provides the atomic per-day counter.
pub struct SequenceRepo;

impl SequenceRepo {
    /// Atomically increment and return the counter for `date_key`,
    /// creating the row with value 1 if absent.
    pub async fn next(executor: impl PgExecutor<'_>, date_key: &str) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO request_sequences (date_key, current_sequence)
             VALUES ($1, 1)
             ON CONFLICT (date_key)
             DO UPDATE SET current_sequence = request_sequences.current_sequence + 1,
                           updated_at = now()
             RETURNING current_sequence",
        )
        .bind(date_key)
        .fetch_one(executor)
        .await
    }

    /// Read the day's counter row without incrementing. `None` if no
    /// allocation has happened for the day yet.
    pub async fn find_by_date_key(
        executor: impl PgExecutor<'_>,
        date_key: &str,
    ) -> Result<Option<RequestSequence>, sqlx::Error> {
        let query =
            format!("SELECT {SEQUENCE_COLUMNS} FROM request_sequences WHERE date_key = $1");
        sqlx::query_as::<_, RequestSequence>(&query)
            .bind(date_key)
            .fetch_optional(executor)
            .await
    }
}
