//! Request state-machine commands (CNT-02, CNT-03).
//!
//! Approval-dimension transitions plus receipt/return/verification. Custody
//! moves are not here: `current_pic_user_id` is written only by the two
//! handover terminal steps in [`crate::handovers`] and
//! [`crate::handover_requests`].

use chrono::Utc;
use serde_json::json;
use validator::Validate;

use casetrack_core::error::CoreError;
use casetrack_core::events as event_types;
use casetrack_core::events::metadata_keys;
use casetrack_core::numbering;
use casetrack_core::status;
use casetrack_core::types::DbId;
use casetrack_db::models::request::{CaseNoteRequest, CreateCaseNoteRequest};
use casetrack_db::models::request_event::{CreateRequestEvent, RequestEvent};
use casetrack_db::repositories::{RequestEventRepo, RequestRepo, SequenceRepo};

use crate::context::{
    ensure_active_department, ensure_active_doctor, ensure_active_location, ensure_active_user,
};
use crate::{append_event, check_custody_invariant, map_db_err, Actor, CustodyEngine};

/// Maximum page size for timeline reads.
const TIMELINE_MAX_LIMIT: i64 = 500;

impl CustodyEngine {
    /// Create a single case-note request.
    ///
    /// Allocates the day's next sequence number inside the same transaction;
    /// if allocation fails, no request is created.
    pub async fn create_request(
        &self,
        actor: &Actor,
        input: &CreateCaseNoteRequest,
    ) -> Result<CaseNoteRequest, CoreError> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        status::validate_priority(&input.priority)?;

        let mut tx = self.pool().begin().await.map_err(map_db_err)?;

        ensure_active_user(&mut *tx, actor.user_id).await?;
        ensure_active_department(&mut *tx, input.department_id).await?;
        ensure_active_location(&mut *tx, input.location_id).await?;
        ensure_active_doctor(&mut *tx, input.doctor_id).await?;

        let key = numbering::date_key(Utc::now().date_naive());
        let sequence = SequenceRepo::next(&mut *tx, &key)
            .await
            .map_err(|_| CoreError::SequenceAllocation(key.clone()))?;
        let request_number = numbering::request_number(&key, sequence);

        let request = RequestRepo::create(&mut *tx, &request_number, input, actor.user_id, None)
            .await
            .map_err(map_db_err)?;

        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_CREATED, actor.user_id)
                .with_metadata(json!({ "request_number": request.request_number })),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(
            request_id = request.id,
            request_number = %request.request_number,
            user_id = actor.user_id,
            "Case-note request created"
        );
        Ok(request)
    }

    /// Approve a pending request.
    pub async fn approve_request(
        &self,
        actor: &Actor,
        request_id: DbId,
        remarks: Option<String>,
    ) -> Result<CaseNoteRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if request.status != status::STATUS_PENDING {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot approve request in status '{}'",
                request.status
            )));
        }

        let request = RequestRepo::approve(&mut *tx, request_id, status::STATUS_APPROVED, actor.user_id)
            .await
            .map_err(map_db_err)?;

        let mut metadata = json!({});
        if let Some(notes) = &remarks {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_APPROVED, actor.user_id)
                .with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, "Request approved");
        Ok(request)
    }

    /// Reject a pending request. The reason is mandatory.
    pub async fn reject_request(
        &self,
        actor: &Actor,
        request_id: DbId,
        reason: &str,
    ) -> Result<CaseNoteRequest, CoreError> {
        let reason = mandatory_reason(reason)?;

        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if request.status != status::STATUS_PENDING {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot reject request in status '{}'",
                request.status
            )));
        }

        let request =
            RequestRepo::reject(&mut *tx, request_id, status::STATUS_REJECTED, actor.user_id, reason)
                .await
                .map_err(map_db_err)?;

        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_REJECTED, actor.user_id)
                .with_reason(reason),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, "Request rejected");
        Ok(request)
    }

    /// Reject a request whose physical note was never actually transferred.
    ///
    /// Distinct audit trail from a standard rejection; reachable from any
    /// receivable state while the note remains unreceived.
    pub async fn reject_not_received(
        &self,
        actor: &Actor,
        request_id: DbId,
        reason: &str,
    ) -> Result<CaseNoteRequest, CoreError> {
        let reason = mandatory_reason(reason)?;

        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if request.is_received {
            return Err(CoreError::PreconditionFailed(
                "request has a confirmed receipt; use the standard paths".into(),
            ));
        }
        if !matches!(
            request.status.as_str(),
            status::STATUS_APPROVED | status::STATUS_IN_PROGRESS
        ) {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot reject-not-received a request in status '{}'",
                request.status
            )));
        }

        let request =
            RequestRepo::reject(&mut *tx, request_id, status::STATUS_REJECTED, actor.user_id, reason)
                .await
                .map_err(map_db_err)?;

        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(
                request.id,
                event_types::EVENT_REJECTED_NOT_RECEIVED,
                actor.user_id,
            )
            .with_reason(reason),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, "Request rejected (never received)");
        Ok(request)
    }

    /// Confirm physical receipt of an approved case note.
    ///
    /// Idempotent: a second call on an already-received request is a no-op
    /// success.
    pub async fn mark_received(
        &self,
        actor: &Actor,
        request_id: DbId,
        notes: Option<String>,
    ) -> Result<CaseNoteRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if request.is_received {
            return Ok(request);
        }
        if request.status != status::STATUS_APPROVED {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot receive request in status '{}'",
                request.status
            )));
        }

        let request = RequestRepo::mark_received(&mut *tx, request_id, actor.user_id)
            .await
            .map_err(map_db_err)?;

        let mut metadata = json!({});
        if let Some(notes) = &notes {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_RECEIVED, actor.user_id)
                .with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, "Receipt confirmed");
        Ok(request)
    }

    /// Close out a request. Requires a confirmed receipt.
    pub async fn complete_request(
        &self,
        actor: &Actor,
        request_id: DbId,
        notes: Option<String>,
    ) -> Result<CaseNoteRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if !matches!(
            request.status.as_str(),
            status::STATUS_APPROVED | status::STATUS_IN_PROGRESS
        ) {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot complete request in status '{}'",
                request.status
            )));
        }
        if !request.is_received {
            return Err(CoreError::PreconditionFailed(
                "cannot complete a request whose receipt was never confirmed".into(),
            ));
        }

        let request = RequestRepo::complete(&mut *tx, request_id, status::STATUS_COMPLETED)
            .await
            .map_err(map_db_err)?;

        let mut metadata = json!({});
        if let Some(notes) = &notes {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_COMPLETED, actor.user_id)
                .with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, "Request completed");
        Ok(request)
    }

    /// The holder returns the note; the request enters return verification.
    pub async fn mark_returned(
        &self,
        actor: &Actor,
        request_id: DbId,
        notes: Option<String>,
    ) -> Result<CaseNoteRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        if !request.is_received {
            return Err(CoreError::PreconditionFailed(
                "cannot return a request whose receipt was never confirmed".into(),
            ));
        }
        if matches!(
            request.status.as_str(),
            status::STATUS_REJECTED | status::STATUS_PENDING_RETURN_VERIFICATION
        ) {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot return request in status '{}'",
                request.status
            )));
        }

        let request = RequestRepo::mark_returned(
            &mut *tx,
            request_id,
            status::STATUS_PENDING_RETURN_VERIFICATION,
            actor.user_id,
        )
        .await
        .map_err(map_db_err)?;

        let mut metadata = json!({});
        if let Some(notes) = &notes {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_types::EVENT_RETURNED, actor.user_id)
                .with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, "Return recorded");
        Ok(request)
    }

    /// MR staff verifies a returned case note.
    ///
    /// Accept closes the record and clears custody; reject flags the return
    /// and moves the request to `rejected`. Idempotent on the matching
    /// terminal state.
    pub async fn verify_return(
        &self,
        actor: &Actor,
        request_id: DbId,
        accept: bool,
        notes: Option<String>,
    ) -> Result<CaseNoteRequest, CoreError> {
        let mut tx = self.pool().begin().await.map_err(map_db_err)?;
        let request = lock_request(&mut tx, request_id).await?;

        // Idempotent re-verification of an already-settled return.
        if request.is_returned && request.status == status::STATUS_COMPLETED && accept {
            return Ok(request);
        }
        if request.is_rejected_return && request.status == status::STATUS_REJECTED && !accept {
            return Ok(request);
        }

        if request.status != status::STATUS_PENDING_RETURN_VERIFICATION {
            return Err(CoreError::PreconditionFailed(format!(
                "cannot verify return for request in status '{}'",
                request.status
            )));
        }

        let (request, event_type) = if accept {
            let updated = RequestRepo::close_return_accepted(
                &mut *tx,
                request_id,
                status::STATUS_COMPLETED,
                casetrack_core::handover::HANDOVER_NONE,
            )
            .await
            .map_err(map_db_err)?;
            (updated, event_types::EVENT_RETURNED_VERIFIED)
        } else {
            let updated = RequestRepo::close_return_rejected(
                &mut *tx,
                request_id,
                status::STATUS_REJECTED,
                actor.user_id,
                notes.as_deref(),
            )
            .await
            .map_err(map_db_err)?;
            (updated, event_types::EVENT_RETURNED_REJECTED)
        };

        check_custody_invariant(&request)?;

        let mut metadata = json!({});
        if let Some(notes) = &notes {
            metadata[metadata_keys::NOTES] = json!(notes);
        }
        let event = append_event(
            &mut tx,
            &CreateRequestEvent::new(request.id, event_type, actor.user_id).with_metadata(metadata),
        )
        .await?;

        tx.commit().await.map_err(map_db_err)?;
        self.publish(&event);

        tracing::info!(request_id, user_id = actor.user_id, accept, "Return verified");
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fetch a request by id.
    pub async fn get_request(&self, request_id: DbId) -> Result<CaseNoteRequest, CoreError> {
        RequestRepo::find_by_id(self.pool(), request_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "CaseNoteRequest",
                id: request_id,
            })
    }

    /// A request's event timeline, oldest first, with the total count.
    pub async fn request_timeline(
        &self,
        request_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RequestEvent>, i64), CoreError> {
        // Existence check so a bad id is a 404, not an empty page.
        self.get_request(request_id).await?;

        let limit = limit.clamp(1, TIMELINE_MAX_LIMIT);
        let offset = offset.max(0);
        let events = RequestEventRepo::list_for_request(self.pool(), request_id, limit, offset)
            .await
            .map_err(map_db_err)?;
        let total = RequestEventRepo::count_for_request(self.pool(), request_id)
            .await
            .map_err(map_db_err)?;
        Ok((events, total))
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the command modules
// ---------------------------------------------------------------------------

/// Lock a request row for the duration of the transaction.
pub(crate) async fn lock_request(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request_id: DbId,
) -> Result<CaseNoteRequest, CoreError> {
    RequestRepo::lock_by_id(&mut **tx, request_id)
        .await
        .map_err(map_db_err)?
        .ok_or(CoreError::NotFound {
            entity: "CaseNoteRequest",
            id: request_id,
        })
}

/// Trim and require a non-empty rejection reason.
fn mandatory_reason(reason: &str) -> Result<&str, CoreError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("a rejection reason is required".into()));
    }
    Ok(trimmed)
}
