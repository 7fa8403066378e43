//! Repository for the `batches` table (CNT-08).

use sqlx::PgExecutor;

use casetrack_core::types::DbId;

use crate::models::batch::{Batch, CreateBatch};

/// Column list for batches queries.
const BATCH_COLUMNS: &str = "id, batch_number, requested_by_user_id, department_id, \
    priority, purpose, needed_date, received_count, is_verified, created_at, updated_at";

/// Provides persistence operations for batches.
pub struct BatchRepo;

impl BatchRepo {
    /// Insert a new batch, returning the created row.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        batch_number: &str,
        requested_by_user_id: DbId,
        input: &CreateBatch,
    ) -> Result<Batch, sqlx::Error> {
        let query = format!(
            "INSERT INTO batches
                (batch_number, requested_by_user_id, department_id, priority,
                 purpose, needed_date)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {BATCH_COLUMNS}"
        );
        sqlx::query_as::<_, Batch>(&query)
            .bind(batch_number)
            .bind(requested_by_user_id)
            .bind(input.department_id)
            .bind(&input.priority)
            .bind(&input.purpose)
            .bind(input.needed_date)
            .fetch_one(executor)
            .await
    }

    /// Find a batch by id.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1");
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a batch by id, taking a row lock for the enclosing transaction.
    pub async fn lock_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Update the materialized receipt roll-up.
    ///
    /// Always recomputed from member rows in the same transaction as the
    /// receipts it reflects — never incremented blindly.
    pub async fn update_receipt_rollup(
        executor: impl PgExecutor<'_>,
        id: DbId,
        received_count: i32,
        is_verified: bool,
    ) -> Result<Batch, sqlx::Error> {
        let query = format!(
            "UPDATE batches
             SET received_count = $2, is_verified = $3, updated_at = now()
             WHERE id = $1
             RETURNING {BATCH_COLUMNS}"
        );
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .bind(received_count)
            .bind(is_verified)
            .fetch_one(executor)
            .await
    }
}
