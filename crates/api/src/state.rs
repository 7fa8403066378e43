use std::sync::Arc;

use casetrack_engine::CustodyEngine;
use casetrack_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: casetrack_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The custody engine all command handlers delegate to.
    pub engine: CustodyEngine,
    /// Event bus carrying post-commit domain events to the notification side.
    pub event_bus: Arc<EventBus>,
}
