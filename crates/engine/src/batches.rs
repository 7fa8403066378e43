//! Batch aggregation and partial-batch receipt verification (CNT-08).
//!
//! One submission creates many requests in a single transaction, each with
//! its own request number. Batch status and the pending/approved/rejected
//! counts are derived from live member rows on every read; only the receipt
//! roll-up is materialized, and it is recomputed transactionally alongside
//! the receipts it reflects.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use casetrack_core::batch::{self, MemberCounts};
use casetrack_core::error::CoreError;
use casetrack_core::events as event_types;
use casetrack_core::events::metadata_keys;
use casetrack_core::numbering;
use casetrack_core::status;
use casetrack_core::types::DbId;
use casetrack_db::models::batch::{Batch, CreateBatch};
use casetrack_db::models::request::{CaseNoteRequest, CreateCaseNoteRequest};
use casetrack_db::models::request_event::CreateRequestEvent;
use casetrack_db::repositories::{BatchRepo, RequestRepo, SequenceRepo};

use crate::context::{
    ensure_active_department, ensure_active_doctor, ensure_active_location, ensure_active_user,
};
use crate::requests::lock_request;
use crate::{append_event, map_db_err, Actor, CustodyEngine};

/// A batch with its derived status and live member counts.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    #[serde(flatten)]
    pub batch: Batch,
    pub status: String,
    pub counts: MemberCounts,
}

impl CustodyEngine {
    /// Create a batch of case-note requests in one submission.
    ///
    /// All members share the classification fields; each gets its own
    /// request number. One transaction: either the whole batch exists or
    /// none of it does.
    pub async fn create_batch(
        &self,
        actor: &Actor,
        input: &CreateBatch,
    ) -> Result<(Batch, Vec<CaseNoteRequest>), CoreError> {
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
        let batch_sequence = SequenceRepo::next(&mut *tx, &key)
            .await
            .map_err(|_| CoreError::SequenceAllocation(key.clone()))?;
        let batch_number = numbering::batch_number(&key, batch_sequence);

        let batch = BatchRepo::create(&mut *tx, &batch_number, actor.user_id, input)
            .await
            .map_err(map_db_err)?;

        let mut members = Vec::with_capacity(input.patient_ids.len());
        let mut events = Vec::with_capacity(input.patient_ids.len());
        for &patient_id in &input.patient_ids {
            let sequence = SequenceRepo::next(&mut *tx, &key)
                .await
                .map_err(|_| CoreError::SequenceAllocation(key.clone()))?;
            let request_number = numbering::request_number(&key, sequence);

            let member = RequestRepo::create(
                &mut *tx,
                &request_number,
                &CreateCaseNoteRequest {
                    patient_id,
                    department_id: input.department_id,
                    doctor_id: input.doctor_id,
                    location_id: input.location_id,
                    priority: input.priority.clone(),
                    purpose: input.purpose.clone(),
                    needed_date: input.needed_date,
                    remarks: None,
                },
                actor.user_id,
                Some(batch.id),
            )
            .await
            .map_err(map_db_err)?;

            let event = append_event(
                &mut tx,
                &CreateRequestEvent::new(member.id, event_types::EVENT_CREATED, actor.user_id)
                    .with_metadata(json!({
                        "request_number": member.request_number,
                        metadata_keys::BATCH_ID: batch.id,
                    })),
            )
            .await?;
            members.push(member);
            events.push(event);
        }

        tx.commit().await.map_err(map_db_err)?;
        for event in &events {
            self.publish(event);
        }

        tracing::info!(
            batch_id = batch.id,
            batch_number = %batch.batch_number,
            members = members.len(),
            user_id = actor.user_id,
            "Batch created"
        );
        Ok((batch, members))
    }

    /// A batch with derived status and live member counts.
    pub async fn batch_summary(&self, batch_id: DbId) -> Result<BatchSummary, CoreError> {
        let batch = BatchRepo::find_by_id(self.pool(), batch_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Batch",
                id: batch_id,
            })?;
        let counts = self.batch_counts(batch_id).await?;
        Ok(BatchSummary {
            status: batch::derive_status(counts).to_string(),
            batch,
            counts,
        })
    }

    /// A batch's member requests, oldest first.
    pub async fn batch_members(&self, batch_id: DbId) -> Result<Vec<CaseNoteRequest>, CoreError> {
        RequestRepo::list_by_batch(self.pool(), batch_id)
            .await
            .map_err(map_db_err)
    }

    /// CA confirms physical receipt for a subset of a batch's approved
    /// members.
    ///
    /// Each receipt follows `mark_received` semantics (idempotent per
    /// member); the roll-up is recomputed from member rows in the same
    /// transaction, and `is_verified` flips once every approved member is
    /// received.
    pub async fn verify_batch_receipt(
        &self,
        actor: &Actor,
        batch_id: DbId,
        received_request_ids: &[DbId],
        notes: Option<String>,
    ) -> Result<Batch, CoreError> {
        if received_request_ids.is_empty() {
            return Err(CoreError::Validation(
                "at least one request id is required".into(),
            ));
        }

        let mut tx = self.pool().begin().await.map_err(map_db_err)?;

        let batch = BatchRepo::lock_by_id(&mut *tx, batch_id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Batch",
                id: batch_id,
            })?;

        let counts = counts_in_tx(&mut tx, batch_id).await?;
        let derived = batch::derive_status(counts);
        if !matches!(derived, batch::BATCH_APPROVED | batch::BATCH_PARTIALLY_APPROVED) {
            return Err(CoreError::PreconditionFailed(format!(
                "batch is not in an approved state (derived status '{derived}')"
            )));
        }

        // Lock members in ascending id order so concurrent verifies for
        // overlapping subsets cannot deadlock.
        let mut ids: Vec<DbId> = received_request_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut events = Vec::new();
        for request_id in ids {
            let member = lock_request(&mut tx, request_id).await?;
            if member.batch_id != Some(batch_id) {
                return Err(CoreError::Validation(format!(
                    "request {request_id} does not belong to batch {batch_id}"
                )));
            }
            if member.is_received {
                continue;
            }
            if member.status != status::STATUS_APPROVED {
                return Err(CoreError::PreconditionFailed(format!(
                    "cannot receive batch member {request_id} in status '{}'",
                    member.status
                )));
            }

            let member = RequestRepo::mark_received(&mut *tx, request_id, actor.user_id)
                .await
                .map_err(map_db_err)?;

            let mut metadata = json!({ metadata_keys::BATCH_ID: batch_id });
            if let Some(notes) = &notes {
                metadata[metadata_keys::NOTES] = json!(notes);
            }
            let event = append_event(
                &mut tx,
                &CreateRequestEvent::new(member.id, event_types::EVENT_RECEIVED, actor.user_id)
                    .with_metadata(metadata),
            )
            .await?;
            events.push(event);
        }

        let received = RequestRepo::count_received_in_batch(&mut *tx, batch_id)
            .await
            .map_err(map_db_err)?;
        let counts = counts_in_tx(&mut tx, batch_id).await?;
        let is_verified = batch::is_receipt_verified(counts, received);
        let batch = BatchRepo::update_receipt_rollup(&mut *tx, batch.id, received as i32, is_verified)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        for event in &events {
            self.publish(event);
        }

        tracing::info!(
            batch_id,
            received_count = batch.received_count,
            is_verified = batch.is_verified,
            user_id = actor.user_id,
            "Batch receipt verified"
        );
        Ok(batch)
    }

    /// Live member counts for a batch.
    pub async fn batch_counts(&self, batch_id: DbId) -> Result<MemberCounts, CoreError> {
        let rows = RequestRepo::status_counts_for_batch(self.pool(), batch_id)
            .await
            .map_err(map_db_err)?;
        Ok(MemberCounts::from_status_counts(
            rows.iter().map(|r| (r.status.as_str(), r.count)),
        ))
    }
}

async fn counts_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    batch_id: DbId,
) -> Result<MemberCounts, CoreError> {
    let rows = RequestRepo::status_counts_for_batch(&mut **tx, batch_id)
        .await
        .map_err(map_db_err)?;
    Ok(MemberCounts::from_status_counts(
        rows.iter().map(|r| (r.status.as_str(), r.count)),
    ))
}
