//! CaseTrack database layer.
//!
//! PostgreSQL access via sqlx: connection pool construction, embedded
//! migrations, entity models, and the repository layer. Repository methods
//! accept any `PgExecutor` so the engine can run them inside a single
//! transaction per command.

use std::time::Duration;

pub mod models;
pub mod repositories;

/// Shared connection pool type.
pub type DbPool = sqlx::PgPool;

/// Migrations embedded from `db/migrations` at the workspace root.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../db/migrations");

/// Create the connection pool.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Cheap connectivity probe used at startup and by the health endpoint.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply any pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
