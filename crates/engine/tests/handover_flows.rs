//! Integration tests for both handover protocols.
//!
//! Direct: holder pushes custody; MR acknowledges; new holder confirms
//! physical receipt. Mediated: non-holder proposes, holder responds,
//! verification moves custody. Custody must never move on intent alone.

use assert_matches::assert_matches;
use sqlx::PgPool;

use casetrack_core::error::CoreError;
use casetrack_db::models::handover::InitiateHandover;
use casetrack_db::models::handover_request::CreateHandoverRequest;
use casetrack_db::models::request::CaseNoteRequest;
use casetrack_engine::handover_requests::HandoverResponse;
use casetrack_engine::CustodyEngine;

mod common;
use common::*;

fn hr_input(fx: &Fixture) -> CreateHandoverRequest {
    CreateHandoverRequest {
        reason: "needed for specialist clinic".to_string(),
        priority: "high".to_string(),
        department_id: fx.department_id,
        location_id: Some(fx.location_id),
        doctor_id: None,
    }
}

/// Create, approve, and receive a request held by the fixture's CA.
async fn held_request(engine: &CustodyEngine, fx: &Fixture, patient_id: i64) -> CaseNoteRequest {
    let request = engine
        .create_request(&ca(fx.ca_user), &request_input(fx, patient_id))
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
    engine.get_request(request.id).await.unwrap()
}

// ---------------------------------------------------------------------------
// Direct protocol
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn initiate_requires_current_holder(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2001).await;

    let err = engine
        .initiate_handover(
            &ca(fx.ward_user),
            request.id,
            &InitiateHandover {
                handed_over_to_user_id: fx.mr_user,
                department_id: fx.department_id,
                location_id: None,
                handover_doctor_id: None,
                handover_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_handover_blocked_while_first_pending(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2002).await;

    engine
        .initiate_handover(
            &ca(fx.ca_user),
            request.id,
            &InitiateHandover {
                handed_over_to_user_id: fx.ward_user,
                department_id: fx.department_id,
                location_id: None,
                handover_doctor_id: None,
                handover_reason: None,
            },
        )
        .await
        .unwrap();

    let err = engine
        .initiate_handover(
            &ca(fx.ca_user),
            request.id,
            &InitiateHandover {
                handed_over_to_user_id: fx.mr_user,
                department_id: fx.department_id,
                location_id: None,
                handover_doctor_id: None,
                handover_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn acknowledge_is_idempotent(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2003).await;

    let handover = engine
        .initiate_handover(
            &ca(fx.ca_user),
            request.id,
            &InitiateHandover {
                handed_over_to_user_id: fx.ward_user,
                department_id: fx.department_id,
                location_id: None,
                handover_doctor_id: None,
                handover_reason: None,
            },
        )
        .await
        .unwrap();

    engine
        .acknowledge_handover(&mr(fx.mr_user), handover.id, None)
        .await
        .unwrap();
    engine
        .acknowledge_handover(&mr(fx.mr_user), handover.id, None)
        .await
        .unwrap();

    // One custody move, one handover_verified event.
    let types = event_types_for(&pool, request.id).await;
    assert_eq!(
        types.iter().filter(|t| *t == "handover_verified").count(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn receipt_confirmation_is_separate_from_acknowledgement(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2004).await;

    let handover = engine
        .initiate_handover(
            &ca(fx.ca_user),
            request.id,
            &InitiateHandover {
                handed_over_to_user_id: fx.ward_user,
                department_id: fx.department_id,
                location_id: None,
                handover_doctor_id: None,
                handover_reason: None,
            },
        )
        .await
        .unwrap();

    // Confirming before MR acknowledgement is premature.
    let err = engine
        .confirm_receipt(&ca(fx.ward_user), handover.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));

    engine
        .acknowledge_handover(&mr(fx.mr_user), handover.id, None)
        .await
        .unwrap();

    // Only the receiving holder may confirm.
    let err = engine
        .confirm_receipt(&ca(fx.ca_user), handover.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden(_));

    let handover = engine
        .confirm_receipt(&ca(fx.ward_user), handover.id, None)
        .await
        .unwrap();
    assert_eq!(handover.status, "completed");
    assert!(handover.receipt_confirmed_at.is_some());

    let request = engine.get_request(request.id).await.unwrap();
    assert_eq!(request.handover_status, "transferred");

    let types = event_types_for(&pool, request.id).await;
    assert_eq!(types.last().map(String::as_str), Some("acknowledged_received"));
}

// ---------------------------------------------------------------------------
// Mediated protocol
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn holder_rejection_leaves_custody_unchanged(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2005).await;

    let hr = engine
        .request_handover(&ca(fx.ward_user), request.id, &hr_input(&fx))
        .await
        .unwrap();
    assert_eq!(hr.status, "pending");

    let hr = engine
        .respond_handover_request(
            &ca(fx.ca_user),
            hr.id,
            HandoverResponse::Reject,
            Some("still in active use".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(hr.status, "rejected");

    let request = engine.get_request(request.id).await.unwrap();
    assert_eq!(request.current_pic_user_id, Some(fx.ca_user));
    assert_eq!(request.handover_status, "none");
    assert_eq!(request.current_handover_id, None);

    // The only events beyond the setup three are the proposal + rejection.
    assert_eq!(
        event_types_for(&pool, request.id).await,
        vec!["created", "approved", "received", "handover_requested", "handover_rejected"],
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approve_parks_custody_until_verification(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2006).await;

    let hr = engine
        .request_handover(&ca(fx.ward_user), request.id, &hr_input(&fx))
        .await
        .unwrap();

    let hr = engine
        .respond_handover_request(&ca(fx.ca_user), hr.id, HandoverResponse::Approve, None)
        .await
        .unwrap();
    assert_eq!(hr.status, "approved_pending_verification");

    // Approval is a commitment, not a transfer.
    let parked = engine.get_request(request.id).await.unwrap();
    assert_eq!(parked.current_pic_user_id, Some(fx.ca_user));
    assert_eq!(parked.handover_status, "approved_pending_verification");
    assert!(parked.current_handover_id.is_some());

    let hr = engine
        .verify_handover_request(&mr(fx.mr_user), hr.id, None)
        .await
        .unwrap();
    assert_eq!(hr.status, "verified");

    let request = engine.get_request(request.id).await.unwrap();
    assert_eq!(request.current_pic_user_id, Some(fx.ward_user));
    assert_eq!(request.handover_status, "verified");
    assert_eq!(request.status, "in_progress");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn verify_is_idempotent_on_custody(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2007).await;

    let hr = engine
        .request_handover(&ca(fx.ward_user), request.id, &hr_input(&fx))
        .await
        .unwrap();
    engine
        .respond_handover_request(&ca(fx.ca_user), hr.id, HandoverResponse::Approve, None)
        .await
        .unwrap();
    engine
        .verify_handover_request(&mr(fx.mr_user), hr.id, None)
        .await
        .unwrap();

    // Re-delivered verification: success, custody unchanged, no new event.
    let hr = engine
        .verify_handover_request(&mr(fx.mr_user), hr.id, None)
        .await
        .unwrap();
    assert_eq!(hr.status, "verified");

    let request = engine.get_request(request.id).await.unwrap();
    assert_eq!(request.current_pic_user_id, Some(fx.ward_user));
    let types = event_types_for(&pool, request.id).await;
    assert_eq!(
        types.iter().filter(|t| *t == "handover_verified").count(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_holder_may_respond(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2008).await;

    let hr = engine
        .request_handover(&ca(fx.ward_user), request.id, &hr_input(&fx))
        .await
        .unwrap();

    let err = engine
        .respond_handover_request(&ca(fx.ward_user), hr.id, HandoverResponse::Approve, None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn holder_cannot_request_their_own_note(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2009).await;

    let err = engine
        .request_handover(&ca(fx.ca_user), request.id, &hr_input(&fx))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn one_open_handover_request_per_note(pool: PgPool) {
    let fx = fixture(&pool).await;
    let engine = engine(&pool);
    let request = held_request(&engine, &fx, 2010).await;

    engine
        .request_handover(&ca(fx.ward_user), request.id, &hr_input(&fx))
        .await
        .unwrap();

    let second_requester = seed_user(&pool, "devi", "ca").await;
    let err = engine
        .request_handover(&ca(second_requester), request.id, &hr_input(&fx))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::PreconditionFailed(_));
}
