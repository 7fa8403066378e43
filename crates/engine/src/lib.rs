//! CaseTrack request lifecycle & custody engine.
//!
//! Every command here runs as one database transaction: lock the target
//! row(s), check preconditions against the locked state, apply the
//! mutation, append the audit event, commit. Losers of a concurrent race
//! observe the changed precondition and fail; nothing is ever half-applied.
//! Domain events go out on the in-process bus only after commit.

use std::sync::Arc;

use casetrack_core::error::CoreError;
use casetrack_core::events as event_types;
use casetrack_core::handover;
use casetrack_db::models::request::CaseNoteRequest;
use casetrack_db::models::request_event::CreateRequestEvent;
use casetrack_db::repositories::RequestEventRepo;
use casetrack_db::DbPool;
use casetrack_events::{DomainEvent, EventBus};

pub mod batches;
pub mod context;
pub mod handover_requests;
pub mod handovers;
pub mod requests;

pub use context::Actor;

/// The custody engine: all state-transition commands and reads.
///
/// Cheap to clone; share one per process.
#[derive(Clone)]
pub struct CustodyEngine {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl CustodyEngine {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Publish a post-commit domain event. Fire-and-forget.
    pub(crate) fn publish(&self, event: &casetrack_db::models::request_event::RequestEvent) {
        self.bus.publish(
            DomainEvent::new(
                event.event_type.clone(),
                event.case_note_request_id,
                event.actor_user_id,
            )
            .with_payload(event.metadata.clone()),
        );
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Map a sqlx error to the domain taxonomy.
///
/// Serialization failures and deadlocks surface as retryable [`Conflict`];
/// everything else is internal.
///
/// [`Conflict`]: CoreError::Conflict
pub(crate) fn map_db_err(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("40001") | Some("40P01") => {
                return CoreError::Conflict("concurrent transition lost the race; retry".into());
            }
            Some("23505") => {
                return CoreError::Conflict(format!(
                    "duplicate value violates unique constraint {}",
                    db.constraint().unwrap_or("unknown")
                ));
            }
            _ => {}
        }
    }
    CoreError::Internal(err.to_string())
}

/// Append an audit event inside the caller's transaction.
///
/// The event type is validated against the registry first; an append
/// failure aborts the whole command — a state change without its event must
/// never be observable.
pub(crate) async fn append_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    input: &CreateRequestEvent,
) -> Result<casetrack_db::models::request_event::RequestEvent, CoreError> {
    event_types::validate_event_type(&input.event_type)?;
    RequestEventRepo::append(&mut **tx, input)
        .await
        .map_err(map_db_err)
}

/// Cross-machine invariant: `handover_status != none` iff the request
/// points at an in-flight handover row. Run inside every transaction that
/// touches the custody dimension; a violation is an engine bug, not a
/// caller error.
pub(crate) fn check_custody_invariant(request: &CaseNoteRequest) -> Result<(), CoreError> {
    let has_pointer = request.current_handover_id.is_some();
    let wants_pointer = request.handover_status != handover::HANDOVER_NONE;
    if wants_pointer == has_pointer {
        Ok(())
    } else {
        Err(CoreError::Internal(format!(
            "custody invariant violated for request {}: handover_status='{}' with{} handover pointer",
            request.id,
            request.handover_status,
            if has_pointer { "" } else { "out" },
        )))
    }
}
