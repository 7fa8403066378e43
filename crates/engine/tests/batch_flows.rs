//! Integration tests for batch aggregation and partial processing.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use sqlx::PgPool;

use casetrack_core::error::CoreError;
use casetrack_db::models::batch::CreateBatch;

mod common;
use common::*;

fn batch_input(fx: &Fixture, patient_ids: Vec<i64>) -> CreateBatch {
    CreateBatch {
        patient_ids,
        department_id: fx.department_id,
        doctor_id: Some(fx.doctor_id),
        location_id: Some(fx.location_id),
        priority: "normal".to_string(),
        purpose: Some("clinic session".to_string()),
        needed_date: NaiveDate::from_ymd_opt(2025, 9, 1),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_members_share_classification_with_distinct_numbers(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let (batch, members) = engine
        .create_batch(&ca(fx.ca_user), &batch_input(&fx, vec![3001, 3002, 3003]))
        .await
        .unwrap();

    assert!(batch.batch_number.starts_with("BCH"));
    assert_eq!(members.len(), 3);

    let mut numbers: Vec<&str> = members.iter().map(|m| m.request_number.as_str()).collect();
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 3, "request numbers must be distinct");

    for member in &members {
        assert_eq!(member.batch_id, Some(batch.id));
        assert_eq!(member.department_id, fx.department_id);
        assert_eq!(member.status, "pending");
        assert_eq!(member.current_pic_user_id, Some(fx.ca_user));
    }

    let summary = engine.batch_summary(batch.id).await.unwrap();
    assert_eq!(summary.status, "pending");
    assert_eq!(summary.counts.total, 3);
    assert_eq!(summary.counts.pending, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn partial_processing_derives_partially_approved(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let (batch, members) = engine
        .create_batch(&ca(fx.ca_user), &batch_input(&fx, vec![3004, 3005, 3006]))
        .await
        .unwrap();

    engine
        .approve_request(&mr(fx.mr_user), members[0].id, None)
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), members[1].id, None)
        .await
        .unwrap();
    engine
        .reject_request(&mr(fx.mr_user), members[2].id, "patient discharged")
        .await
        .unwrap();

    let summary = engine.batch_summary(batch.id).await.unwrap();
    assert_eq!(summary.status, "partially_approved");
    assert_eq!(summary.counts.approved, 2);
    assert_eq!(summary.counts.rejected, 1);
    assert_eq!(summary.counts.pending, 0);
    assert_eq!(
        summary.counts.approved + summary.counts.rejected + summary.counts.pending,
        summary.counts.total
    );

    // Receive one of the two approved members: roll-up but not verified.
    let batch = engine
        .verify_batch_receipt(&ca(fx.ca_user), batch.id, &[members[0].id], None)
        .await
        .unwrap();
    assert_eq!(batch.received_count, 1);
    assert!(!batch.is_verified);

    // Receive the second: fully verified.
    let batch = engine
        .verify_batch_receipt(&ca(fx.ca_user), batch.id, &[members[1].id], None)
        .await
        .unwrap();
    assert_eq!(batch.received_count, 2);
    assert!(batch.is_verified);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fully_resolved_batches_derive_terminal_statuses(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let (approved_batch, members) = engine
        .create_batch(&ca(fx.ca_user), &batch_input(&fx, vec![3007, 3008]))
        .await
        .unwrap();
    for m in &members {
        engine.approve_request(&mr(fx.mr_user), m.id, None).await.unwrap();
    }
    let summary = engine.batch_summary(approved_batch.id).await.unwrap();
    assert_eq!(summary.status, "approved");

    let (rejected_batch, members) = engine
        .create_batch(&ca(fx.ca_user), &batch_input(&fx, vec![3009, 3010]))
        .await
        .unwrap();
    for m in &members {
        engine
            .reject_request(&mr(fx.mr_user), m.id, "records archived off-site")
            .await
            .unwrap();
    }
    let summary = engine.batch_summary(rejected_batch.id).await.unwrap();
    assert_eq!(summary.status, "rejected");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn receipt_verification_requires_approved_state(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let (batch, members) = engine
        .create_batch(&ca(fx.ca_user), &batch_input(&fx, vec![3011]))
        .await
        .unwrap();

    let err = engine
        .verify_batch_receipt(&ca(fx.ca_user), batch.id, &[members[0].id], None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn foreign_member_id_is_rejected(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let (batch, members) = engine
        .create_batch(&ca(fx.ca_user), &batch_input(&fx, vec![3012]))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), members[0].id, None)
        .await
        .unwrap();

    let stray = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 3013))
        .await
        .unwrap();

    let err = engine
        .verify_batch_receipt(&ca(fx.ca_user), batch.id, &[stray.id], None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_creation_leaves_no_partial_batch(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let mut input = batch_input(&fx, vec![3014, 3015]);
    input.doctor_id = Some(99999);

    let err = engine.create_batch(&ca(fx.ca_user), &input).await.unwrap_err();
    assert_matches!(err, CoreError::ReferenceNotFound { entity: "Doctor", .. });

    let batches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
        .fetch_one(&pool)
        .await
        .unwrap();
    let requests: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM case_note_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((batches, requests), (0, 0));
}
