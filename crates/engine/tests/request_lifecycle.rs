//! Integration tests for the request state machine.
//!
//! Exercises the engine against a real database: the direct-handover
//! scenario end to end, precondition failures, mandatory rejection reasons,
//! receipt idempotence, and return verification both ways.

use assert_matches::assert_matches;
use sqlx::PgPool;

use casetrack_core::error::CoreError;
use casetrack_db::models::handover::InitiateHandover;

mod common;
use common::*;

// ---------------------------------------------------------------------------
// The canonical direct-handover scenario
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn direct_handover_end_to_end(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1001))
        .await
        .unwrap();
    assert_eq!(request.status, "pending");
    assert_eq!(request.current_pic_user_id, Some(fx.ca_user));
    assert_eq!(request.handover_status, "none");
    assert!(request.request_number.starts_with("CNR"));

    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();

    let handover = engine
        .initiate_handover(
            &ca(fx.ca_user),
            request.id,
            &InitiateHandover {
                handed_over_to_user_id: fx.ward_user,
                department_id: fx.department_id,
                location_id: Some(fx.location_id),
                handover_doctor_id: None,
                handover_reason: Some("patient moved to ward 3A".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(handover.status, "pending");

    engine
        .acknowledge_handover(&mr(fx.mr_user), handover.id, None)
        .await
        .unwrap();

    let request = engine.get_request(request.id).await.unwrap();
    assert_eq!(request.current_pic_user_id, Some(fx.ward_user));
    assert_eq!(request.handover_status, "completed");
    assert_eq!(request.status, "in_progress");

    // Exactly five ordered events.
    assert_eq!(
        event_types_for(&pool, request.id).await,
        vec!["created", "approved", "received", "handed_over", "handover_verified"],
    );
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_unreceived_fails(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1002))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();

    let err = engine
        .complete_request(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));

    // No stray event, no state change.
    assert_eq!(event_types_for(&pool, request.id).await, vec!["created", "approved"]);
    let request = engine.get_request(request.id).await.unwrap();
    assert_eq!(request.status, "approved");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approve_non_pending_fails(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1003))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();

    let err = engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reject_requires_reason(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1004))
        .await
        .unwrap();

    let err = engine
        .reject_request(&mr(fx.mr_user), request.id, "   ")
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let request = engine
        .reject_request(&mr(fx.mr_user), request.id, "duplicate of an open request")
        .await
        .unwrap();
    assert_eq!(request.status, "rejected");
    assert_eq!(
        request.rejection_reason.as_deref(),
        Some("duplicate of an open request")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_inactive_department_fails(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    sqlx::query("UPDATE departments SET is_active = FALSE WHERE id = $1")
        .bind(fx.department_id)
        .execute(&pool)
        .await
        .unwrap();

    let err = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1005))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::ReferenceNotFound { entity: "Department", .. });

    // The failed creation must not leak a sequence-numbered request.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM case_note_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_received_is_idempotent(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1006))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();

    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();
    // Retrying client: second call succeeds without a second event.
    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();

    assert_eq!(
        event_types_for(&pool, request.id).await,
        vec!["created", "approved", "received"],
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reject_not_received_is_a_distinct_event(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1007))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();

    let request = engine
        .reject_not_received(&mr(fx.mr_user), request.id, "note never left the MR office")
        .await
        .unwrap();
    assert_eq!(request.status, "rejected");

    assert_eq!(
        event_types_for(&pool, request.id).await,
        vec!["created", "approved", "rejected_not_received"],
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reject_not_received_refused_once_received(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1008))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();

    let err = engine
        .reject_not_received(&mr(fx.mr_user), request.id, "claimed missing")
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));
}

// ---------------------------------------------------------------------------
// Return verification
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn verified_return_closes_and_clears_custody(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1009))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_returned(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();

    let request = engine
        .verify_return(&mr(fx.mr_user), request.id, true, None)
        .await
        .unwrap();
    assert_eq!(request.status, "completed");
    assert_eq!(request.current_pic_user_id, None);
    assert_eq!(request.handover_status, "none");
    assert!(request.is_returned);
    assert!(!request.is_rejected_return);

    // Idempotent re-verification: no extra event.
    engine
        .verify_return(&mr(fx.mr_user), request.id, true, None)
        .await
        .unwrap();
    assert_eq!(
        event_types_for(&pool, request.id).await,
        vec!["created", "approved", "received", "returned", "returned_verified"],
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_return_flags_the_request(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1010))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_returned(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();

    let request = engine
        .verify_return(
            &mr(fx.mr_user),
            request.id,
            false,
            Some("folder came back incomplete".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(request.status, "rejected");
    assert!(request.is_rejected_return);

    assert_eq!(
        event_types_for(&pool, request.id).await,
        vec!["created", "approved", "received", "returned", "returned_rejected"],
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn return_requires_receipt(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1011))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();

    let err = engine
        .mark_returned(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));
}

// ---------------------------------------------------------------------------
// Timeline reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn timeline_is_paginated_and_ordered(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);

    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(&fx, 1012))
        .await
        .unwrap();
    engine
        .approve_request(&mr(fx.mr_user), request.id, None)
        .await
        .unwrap();
    engine
        .mark_received(&ca(fx.ca_user), request.id, None)
        .await
        .unwrap();

    let (page, total) = engine.request_timeline(request.id, 2, 0).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].event_type, "created");
    assert_eq!(page[1].event_type, "approved");

    let (page, _) = engine.request_timeline(request.id, 2, 2).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].event_type, "received");

    let err = engine.request_timeline(9999, 10, 0).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { .. });
}
