//! Stand-in dispatcher for the external notification collaborator.
//!
//! [`DispatchLog`] drains the bus and logs every event with structured
//! fields. The real notification dispatcher (email/SMS/push) subscribes the
//! same way; this task exists so published events are observable even when
//! no external dispatcher is attached.

use tokio::sync::broadcast;

use crate::bus::DomainEvent;

/// Background task that logs every published domain event.
pub struct DispatchLog;

impl DispatchLog {
    /// Run the dispatch loop until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        case_note_request_id = event.case_note_request_id,
                        actor_user_id = event.actor_user_id,
                        "Domain event dispatched"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event dispatch lagged, events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, dispatch shutting down");
                    break;
                }
            }
        }
    }
}
