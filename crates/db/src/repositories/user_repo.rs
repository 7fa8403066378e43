//! Repository for the `users` reference table.

use sqlx::PgExecutor;

use casetrack_core::types::DbId;

use crate::models::user::User;

/// Column list for users queries.
const USER_COLUMNS: &str = "id, name, email, role, is_active, created_at, updated_at";

/// Read-only access to users (maintained externally).
pub struct UserRepo;

impl UserRepo {
    /// Find a user by id regardless of active flag.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find an active user by id.
    pub async fn find_active_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
