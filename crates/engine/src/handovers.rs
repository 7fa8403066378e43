//! Direct handover protocol and the acknowledgement SLA sweep (CNT-04).
//!
//! The current holder pushes custody forward: initiate creates the
//! transfer record, MR acknowledgement moves custody, and the receiving
//! holder's confirmation closes the record. Custody never moves at
//! initiate.

use chrono::Duration;
use serde::Serialize;
use serde_json::json;

use casetrack_core::error::CoreError;
use casetrack_core::events as event_types;
use casetrack_core::events::metadata_keys;
use casetrack_core::handover;
use casetrack_core::status;
use casetrack_core::types::{DbId, Timestamp};
use casetrack_db::models::handover::{CreateHandover, Handover, InitiateHandover};
use casetrack_db::models::request_event::CreateRequestEvent;
use casetrack_db::repositories::{HandoverRepo, HandoverRequestRepo, RequestRepo};

use crate::context::{
    ensure_active_department, ensure_active_doctor, ensure_active_location, ensure_active_user,
};
use crate::requests::lock_request;
use crate::{append_event, check_custody_invariant, map_db_err, Actor, CustodyEngine};

/// Result of one SLA sweep pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    /// Handovers that breached the 6-hour acknowledgement window this pass.
    pub newly_overdue: Vec<DbId>,
    /// Overdue handovers now flagged reminder-eligible.
    pub reminders: Vec<DbId>,
    /// Handovers overdue long enough to be flagged escalation-eligible.
    pub escalations: Vec<DbId>,
}

impl CustodyEngine {
    /// Initiate a direct handover of a held case note.
    pub async fn initiate_handover(
        &self,
        actor: &Actor,
        request_id: DbId,
        input: &InitiateHandover,
    ) -> Result<Handover, CoreError> {
        if input.handed_over_to_user_id == actor.user_id {
            return Err(CoreError::Validation(
                "cannot hand a case note over to yourself".into(),
            ));
        }

        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if request.current_pic_user_id != Some(actor.user_id) {
            return Err(CoreError::Forbidden(
                "only the current holder can initiate a handover".into(),
            ));
        }
        if !matches!(
            request.status.as_str(),
            status::STATUS_APPROVED | status::STATUS_IN_PROGRESS
        ) {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot hand over request in status '{}'",
                request.status
            )));
        }
        if !request.is_received {
            return Err(CoreError::PreconditionFailed(
                "cannot hand over a case note whose receipt was never confirmed".into(),
            ));
        }
        if handover::blocks_new_handover(&request.handover_status) {
            return Err(CoreError::PreconditionFailed(format!(
                "a handover is already in flight (handover status '{}')",
                request.handover_status
            )));
        }
        let in_flight = HandoverRequestRepo::find_in_flight_for_request(
            &mut *tx,
            request_id,
            handover::REQUEST_IN_FLIGHT_STATUSES,
        )
        .await
        .map_err(map_db_err)?;
        if in_flight.is_some() {
            return Err(CoreError::PreconditionFailed(
                "an open handover request exists for this case note".into(),
            ));
        }

        ensure_active_user(&mut *tx, input.handed_over_to_user_id).await?;
        ensure_active_department(&mut *tx, input.department_id).await?;
        ensure_active_location(&mut *tx, input.location_id).await?;
        ensure_active_doctor(&mut *tx, input.handover_doctor_id).await?;

        let handover_row = HandoverRepo::create(
            &mut *tx,
            &CreateHandover {
                case_note_request_id: request_id,
                handover_request_id: None,
                handed_over_by_user_id: actor.user_id,
                handed_over_to_user_id: input.handed_over_to_user_id,
                department_id: input.department_id,
                location_id: input.location_id,
                handover_doctor_id: input.handover_doctor_id,
                handover_reason: input.handover_reason.clone(),
            },
        )
        .await
        .map_err(map_db_err)?;

        let request = RequestRepo::set_handover_pointer(
            &mut *tx,
            request_id,
            handover_row.id,
            handover::HANDOVER_PENDING,
        )
        .await
        .map_err(map_db_err)?;
        check_custody_invariant(&request)?;

        let event = append_event(
            &mut tx,
            &CreateRequestEvent {
                case_note_request_id: request_id,
                event_type: event_types::EVENT_HANDED_OVER.to_string(),
                actor_user_id: actor.user_id,
                to_location_id: input.location_id,
                to_person: None,
                reason: input.handover_reason.clone(),
                metadata: json!({
                    metadata_keys::HANDOVER_ID: handover_row.id,
                    metadata_keys::TO_USER_ID: input.handed_over_to_user_id,
                }),
            },
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(
            request_id,
            handover_id = handover_row.id,
            from_user = actor.user_id,
            to_user = input.handed_over_to_user_id,
            "Handover initiated"
        );
        Ok(handover_row)
    }

    /// MR staff acknowledges the handover paperwork; custody moves here.
    ///
    /// Idempotent once acknowledged. The receiving holder still confirms
    /// physical receipt separately via [`confirm_receipt`].
    ///
    /// [`confirm_receipt`]: CustodyEngine::confirm_receipt
    pub async fn acknowledge_handover(
        &self,
        actor: &Actor,
        handover_id: DbId,
        notes: Option<String>,
    ) -> Result<Handover, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;

        // Resolve the request id first so rows always lock in the same
        // order: request, then handover.
        let preview = HandoverRepo::find_by_id(&mut *tx, handover_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Handover",
                id: handover_id,
            })?;
        let request = lock_request(&mut tx, preview.case_note_request_id).await?;
        let handover_row = HandoverRepo::lock_by_id(&mut *tx, handover_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Handover",
                id: handover_id,
            })?;

        if matches!(
            handover_row.status.as_str(),
            handover::RECORD_ACKNOWLEDGED | handover::RECORD_COMPLETED
        ) {
            return Ok(handover_row);
        }
        if handover_row.status != handover::RECORD_PENDING {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot acknowledge handover in status '{}'",
                handover_row.status
            )));
        }

        let handover_row =
            HandoverRepo::mark_verified(&mut *tx, handover_id, handover::RECORD_ACKNOWLEDGED)
                .await
                .map_err(map_db_err)?;

        // Entering circulation: an approved request becomes in_progress the
        // moment custody leaves the original requester.
        let new_status = if request.status == status::STATUS_APPROVED {
            status::STATUS_IN_PROGRESS
        } else {
            request.status.as_str()
        };
        let request = RequestRepo::transfer_custody(
            &mut *tx,
            request.id,
            handover_row.handed_over_to_user_id,
            handover::HANDOVER_COMPLETED,
            new_status,
        )
        .await
        .map_err(map_db_err)?;
        check_custody_invariant(&request)?;

        let mut metadata = json!({
            metadata_keys::HANDOVER_ID: handover_row.id,
            metadata_keys::TO_USER_ID: handover_row.handed_over_to_user_id,
            metadata_keys::HANDOVER_STATUS: handover::HANDOVER_COMPLETED,
        });
        if let Some(notes) = &notes {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_HANDOVER_VERIFIED, actor.user_id)
                .with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(
            request_id = request.id,
            handover_id,
            new_holder = handover_row.handed_over_to_user_id,
            "Handover acknowledged, custody transferred"
        );
        Ok(handover_row)
    }

    /// The receiving holder confirms physical receipt of the case note.
    ///
    /// Idempotent once the record is completed. This is deliberately a
    /// separate step from paperwork acknowledgement and produces its own
    /// audit event.
    pub async fn confirm_receipt(
        &self,
        actor: &Actor,
        handover_id: DbId,
        notes: Option<String>,
    ) -> Result<Handover, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;

        let preview = HandoverRepo::find_by_id(&mut *tx, handover_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Handover",
                id: handover_id,
            })?;
        let request = lock_request(&mut tx, preview.case_note_request_id).await?;
        let handover_row = HandoverRepo::lock_by_id(&mut *tx, handover_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Handover",
                id: handover_id,
            })?;

        if handover_row.handed_over_to_user_id != actor.user_id {
            return Err(CoreError::Forbidden(
                "only the receiving holder can confirm receipt".into(),
            ));
        }
        if handover_row.status == handover::RECORD_COMPLETED {
            return Ok(handover_row);
        }
        if handover_row.status != handover::RECORD_ACKNOWLEDGED {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot confirm receipt for handover in status '{}'",
                handover_row.status
            )));
        }

        let handover_row =
            HandoverRepo::confirm_receipt(&mut *tx, handover_id, handover::RECORD_COMPLETED)
                .await
                .map_err(map_db_err)?;
        let request = RequestRepo::set_handover_status(
            &mut *tx,
            request.id,
            handover::HANDOVER_TRANSFERRED,
        )
        .await
        .map_err(map_db_err)?;
        check_custody_invariant(&request)?;

        let mut metadata = json!({ metadata_keys::HANDOVER_ID: handover_row.id });
        if let Some(notes) = &notes {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(
                request.id,
                event_types::EVENT_ACKNOWLEDGED_RECEIVED,
                actor.user_id,
            )
            .with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(
            request_id = request.id,
            handover_id,
            user_id = actor.user_id,
            "Physical receipt confirmed by new holder"
        );
        Ok(handover_row)
    }

    /// One pass of the acknowledgement SLA sweep.
    ///
    /// Stamps `overdue_at` on pending handovers past the 6-hour window,
    /// then flags reminder- and escalation-eligible rows. Each statement is
    /// an atomic bounded UPDATE; no locks are held between passes. Actual
    /// reminder/escalation delivery belongs to the notification
    /// collaborator.
    pub async fn sweep_overdue(&self, now: Timestamp) -> Result<SweepSummary, CoreError> {
        let cutoff = now - Duration::hours(handover::ACK_SLA_HOURS);
        let escalation_cutoff = now - Duration::hours(handover::ESCALATION_AFTER_HOURS);

        let newly_overdue =
            HandoverRepo::mark_overdue(self.pool(), handover::RECORD_PENDING, cutoff, now)
                .await
                .map_err(map_db_err)?;
        let reminders = HandoverRepo::stamp_reminders(self.pool(), handover::RECORD_PENDING, now)
            .await
            .map_err(map_db_err)?;
        let escalations = HandoverRepo::stamp_escalations(
            self.pool(),
            handover::RECORD_PENDING,
            escalation_cutoff,
            now,
        )
        .await
        .map_err(map_db_err)?;

        if !newly_overdue.is_empty() || !reminders.is_empty() || !escalations.is_empty() {
            tracing::info!(
                newly_overdue = newly_overdue.len(),
                reminders = reminders.len(),
                escalations = escalations.len(),
                "Handover SLA sweep stamped rows"
            );
        }

        Ok(SweepSummary {
            newly_overdue,
            reminders,
            escalations,
        })
    }

    /// Fetch a handover by id.
    pub async fn get_handover(&self, handover_id: DbId) -> Result<Handover, CoreError> {
        HandoverRepo::find_by_id(self.pool(), handover_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Handover",
                id: handover_id,
            })
    }
}
