use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casetrack_engine::CustodyEngine;
use casetrack_events::EventBus;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casetrack_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = casetrack_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    casetrack_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let engine = CustodyEngine::new(pool, Arc::new(EventBus::default()));

    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(casetrack_worker::run_sla_sweep(engine, cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    let _ = sweep.await;
}
