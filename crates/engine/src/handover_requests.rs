//! Mediated handover protocol (CNT-05).
//!
//! A non-holder asks the current holder to release a case note. Approval
//! is the holder's commitment; verification is the physical-custody
//! confirmation. Custody moves only at verification — never on intent.

use serde_json::json;
use validator::Validate;

use casetrack_core::error::CoreError;
use casetrack_core::events as event_types;
use casetrack_core::events::metadata_keys;
use casetrack_core::handover;
use casetrack_core::status;
use casetrack_core::types::DbId;
use casetrack_db::models::handover::CreateHandover;
use casetrack_db::models::handover_request::{CreateHandoverRequest, HandoverRequest};
use casetrack_db::models::request_event::CreateRequestEvent;
use casetrack_db::repositories::{HandoverRepo, HandoverRequestRepo, RequestRepo};

use crate::context::{
    ensure_active_department, ensure_active_doctor, ensure_active_location, ensure_active_user,
};
use crate::requests::lock_request;
use crate::{append_event, check_custody_invariant, map_db_err, Actor, CustodyEngine};

/// The holder's response to a mediated handover request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverResponse {
    Approve,
    Reject,
}

impl CustodyEngine {
    /// Propose taking custody of a case note held by someone else.
    ///
    /// The target request row is untouched: this is a proposal, not a
    /// commitment.
    pub async fn request_handover(
        &self,
        actor: &Actor,
        case_note_request_id: DbId,
        input: &CreateHandoverRequest,
    ) -> Result<HandoverRequest, CoreError> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        status::validate_priority(&input.priority)?;

        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, case_note_request_id).await?;

        if status::is_terminal(&request.status) {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot request handover of a request in status '{}'",
                request.status
            )));
        }
        if !request.is_received {
            return Err(CoreError::PreconditionFailed(
                "the case note has no confirmed holder to request it from".into(),
            ));
        }
        let Some(holder_id) = request.current_pic_user_id else {
            return Err(CoreError::PreconditionFailed(
                "the case note has no current holder".into(),
            ));
        };
        if holder_id == actor.user_id {
            return Err(CoreError::Validation(
                "you already hold this case note".into(),
            ));
        }
        if handover::blocks_new_handover(&request.handover_status) {
            return Err(CoreError::PreconditionFailed(format!(
                "a direct handover is already in flight (handover status '{}')",
                request.handover_status
            )));
        }
        let in_flight = HandoverRequestRepo::find_in_flight_for_request(
            &mut *tx,
            case_note_request_id,
            handover::REQUEST_IN_FLIGHT_STATUSES,
        )
        .await
        .map_err(map_db_err)?;
        if in_flight.is_some() {
            return Err(CoreError::PreconditionFailed(
                "an open handover request already exists for this case note".into(),
            ));
        }

        ensure_active_user(&mut *tx, actor.user_id).await?;
        ensure_active_department(&mut *tx, input.department_id).await?;
        ensure_active_location(&mut *tx, input.location_id).await?;
        ensure_active_doctor(&mut *tx, input.doctor_id).await?;

        let hr = HandoverRequestRepo::create(
            &mut *tx,
            case_note_request_id,
            actor.user_id,
            holder_id,
            input,
        )
        .await
        .map_err(map_db_err)?;

        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(
                case_note_request_id,
                event_types::EVENT_HANDOVER_REQUESTED,
                actor.user_id,
            )
            .with_reason(&hr.reason)
            .with_metadata(json!({ metadata_keys::HANDOVER_REQUEST_ID: hr.id })),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(
            case_note_request_id,
            handover_request_id = hr.id,
            requested_by = actor.user_id,
            holder = holder_id,
            "Handover requested"
        );
        Ok(hr)
    }

    /// The current holder approves or rejects a pending handover request.
    ///
    /// Reject is terminal and leaves the case note untouched. Approve
    /// materializes the backing transfer record and parks the request in
    /// `approved_pending_verification` — custody has not moved.
    pub async fn respond_handover_request(
        &self,
        actor: &Actor,
        handover_request_id: DbId,
        response: HandoverResponse,
        notes: Option<String>,
    ) -> Result<HandoverRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;

        let preview = HandoverRequestRepo::find_by_id(&mut *tx, handover_request_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "HandoverRequest",
                id: handover_request_id,
            })?;
        let request = lock_request(&mut tx, preview.case_note_request_id).await?;
        let hr = HandoverRequestRepo::lock_by_id(&mut *tx, handover_request_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "HandoverRequest",
                id: handover_request_id,
            })?;

        if hr.current_holder_user_id != actor.user_id {
            return Err(CoreError::Forbidden(
                "only the current holder can respond to a handover request".into(),
            ));
        }
        if hr.status != handover::REQUEST_PENDING {
            return Err(CoreError::PreconditionFailed(format!(
                "handover request already resolved (status '{}')",
                hr.status
            )));
        }
        // The proposal was addressed to whoever held the note at the time;
        // if custody moved since, the recorded holder is stale.
        if request.current_pic_user_id != Some(hr.current_holder_user_id) {
            return Err(CoreError::PreconditionFailed(
                "custody changed since this handover request was made".into(),
            ));
        }

        let (hr, event) = match response {
            HandoverResponse::Reject => {
                let hr = HandoverRequestRepo::respond(
                    &mut *tx,
                    handover_request_id,
                    handover::REQUEST_REJECTED,
                    notes.as_deref(),
                )
                .await
                .map_err(map_db_err)?;

                let event = append_event(
                    &mut tx,
                    &CreateRequestEvent::new(
                        request.id,
                        event_types::EVENT_HANDOVER_REJECTED,
                        actor.user_id,
                    )
                    .with_metadata(json!({ metadata_keys::HANDOVER_REQUEST_ID: hr.id })),
                )
                .await?;
                (hr, event)
            }
            HandoverResponse::Approve => {
                let hr = HandoverRequestRepo::respond(
                    &mut *tx,
                    handover_request_id,
                    handover::REQUEST_APPROVED_PENDING_VERIFICATION,
                    notes.as_deref(),
                )
                .await
                .map_err(map_db_err)?;

                // Materialize the backing transfer so the request points at
                // one in-flight handover row regardless of protocol.
                let handover_row = HandoverRepo::create(
                    &mut *tx,
                    &CreateHandover {
                        case_note_request_id: request.id,
                        handover_request_id: Some(hr.id),
                        handed_over_by_user_id: hr.current_holder_user_id,
                        handed_over_to_user_id: hr.requested_by_user_id,
                        department_id: hr.department_id,
                        location_id: hr.location_id,
                        handover_doctor_id: hr.doctor_id,
                        handover_reason: Some(hr.reason.clone()),
                    },
                )
                .await
                .map_err(map_db_err)?;

                let request = RequestRepo::set_handover_pointer(
                    &mut *tx,
                    request.id,
                    handover_row.id,
                    handover::HANDOVER_APPROVED_PENDING_VERIFICATION,
                )
                .await
                .map_err(map_db_err)?;
                check_custody_invariant(&request)?;

                let event = append_event(
                    &mut tx,
                    &CreateRequestEvent::new(
                        request.id,
                        event_types::EVENT_HANDOVER_APPROVED,
                        actor.user_id,
                    )
                    .with_metadata(json!({
                        metadata_keys::HANDOVER_REQUEST_ID: hr.id,
                        metadata_keys::HANDOVER_ID: handover_row.id,
                    })),
                )
                .await?;
                (hr, event)
            }
        };

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(
            handover_request_id,
            case_note_request_id = preview.case_note_request_id,
            user_id = actor.user_id,
            approved = matches!(response, HandoverResponse::Approve),
            "Handover request resolved"
        );
        Ok(hr)
    }

    /// Verify the physical transfer of an approved handover request.
    ///
    /// Only now does custody move to the requester. Idempotent: verifying
    /// an already-verified request succeeds without moving custody again.
    pub async fn verify_handover_request(
        &self,
        actor: &Actor,
        handover_request_id: DbId,
        notes: Option<String>,
    ) -> Result<HandoverRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;

        let preview = HandoverRequestRepo::find_by_id(&mut *tx, handover_request_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "HandoverRequest",
                id: handover_request_id,
            })?;
        let request = lock_request(&mut tx, preview.case_note_request_id).await?;
        let hr = HandoverRequestRepo::lock_by_id(&mut *tx, handover_request_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "HandoverRequest",
                id: handover_request_id,
            })?;

        if hr.status == handover::REQUEST_VERIFIED {
            return Ok(hr);
        }
        if hr.status != handover::REQUEST_APPROVED_PENDING_VERIFICATION {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot verify handover request in status '{}'",
                hr.status
            )));
        }
        if !actor.is_mr_staff() && actor.user_id != hr.requested_by_user_id {
            return Err(CoreError::Forbidden(
                "only MR staff or the requester can verify the transfer".into(),
            ));
        }

        let hr = HandoverRequestRepo::verify(
            &mut *tx,
            handover_request_id,
            handover::REQUEST_VERIFIED,
            actor.user_id,
            notes.as_deref(),
        )
        .await
        .map_err(map_db_err)?;

        // Close the backing transfer record.
        if let Some(handover_id) = request.current_handover_id {
            HandoverRepo::mark_verified(&mut *tx, handover_id, handover::RECORD_COMPLETED)
                .await
                .map_err(map_db_err)?;
        }

        let new_status = if request.status == status::STATUS_APPROVED {
            status::STATUS_IN_PROGRESS
        } else {
            request.status.as_str()
        };
        let request = RequestRepo::transfer_custody(
            &mut *tx,
            request.id,
            hr.requested_by_user_id,
            handover::HANDOVER_VERIFIED,
            new_status,
        )
        .await
        .map_err(map_db_err)?;
        check_custody_invariant(&request)?;

        let mut metadata = json!({
            metadata_keys::HANDOVER_REQUEST_ID: hr.id,
            metadata_keys::TO_USER_ID: hr.requested_by_user_id,
            metadata_keys::HANDOVER_STATUS: handover::HANDOVER_VERIFIED,
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
            handover_request_id,
            case_note_request_id = request.id,
            new_holder = hr.requested_by_user_id,
            verified_by = actor.user_id,
            "Handover request verified, custody transferred"
        );
        Ok(hr)
    }

    /// Fetch a handover request by id.
    pub async fn get_handover_request(
        &self,
        handover_request_id: DbId,
    ) -> Result<HandoverRequest, CoreError> {
        HandoverRequestRepo::find_by_id(self.pool(), handover_request_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "HandoverRequest",
                id: handover_request_id,
            })
    }

    /// Pending handover requests awaiting a holder's response.
    pub async fn pending_handover_requests_for_holder(
        &self,
        holder_user_id: DbId,
    ) -> Result<Vec<HandoverRequest>, CoreError> {
        HandoverRequestRepo::list_pending_for_holder(
            self.pool(),
            holder_user_id,
            handover::REQUEST_PENDING,
        )
        .await
        .map_err(map_db_err)
    }
}
