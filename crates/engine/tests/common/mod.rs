//! Shared fixtures for the engine integration tests.

use std::sync::Arc;

use sqlx::PgPool;

use casetrack_core::types::DbId;
use casetrack_db::models::request::CreateCaseNoteRequest;
use casetrack_db::models::user::roles;
use casetrack_engine::{Actor, CustodyEngine};
use casetrack_events::EventBus;

pub fn engine(pool: &PgPool) -> CustodyEngine {
    CustodyEngine::new(pool.clone(), Arc::new(EventBus::default()))
}

pub fn ca(user_id: DbId) -> Actor {
    Actor::new(user_id, roles::CA)
}

pub fn mr(user_id: DbId) -> Actor {
    Actor::new(user_id, roles::MR)
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, name: &str, role: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(format!("{name}@clinic.test"))
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn seed_department(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO departments (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn seed_location(pool: &PgPool, department_id: DbId, name: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO locations (department_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(department_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_doctor(pool: &PgPool, department_id: DbId, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO doctors (department_id, name) VALUES ($1, $2) RETURNING id")
        .bind(department_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// The cast and reference data most scenarios need.
pub struct Fixture {
    /// Clinic assistant who files requests and holds notes.
    pub ca_user: DbId,
    /// A second ward user for custody transfers.
    pub ward_user: DbId,
    /// Medical Records staff.
    pub mr_user: DbId,
    pub department_id: DbId,
    pub location_id: DbId,
    pub doctor_id: DbId,
}

pub async fn fixture(pool: &PgPool) -> Fixture {
    let department_id = seed_department(pool, "Cardiology").await;
    Fixture {
        ca_user: seed_user(pool, "aina", roles::CA).await,
        ward_user: seed_user(pool, "borhan", roles::CA).await,
        mr_user: seed_user(pool, "chandra", roles::MR).await,
        location_id: seed_location(pool, department_id, "Ward 3A").await,
        doctor_id: seed_doctor(pool, department_id, "Dr. Rahim").await,
        department_id,
    }
}

pub fn request_input(fx: &Fixture, patient_id: DbId) -> CreateCaseNoteRequest {
    CreateCaseNoteRequest {
        patient_id,
        department_id: fx.department_id,
        doctor_id: Some(fx.doctor_id),
        location_id: Some(fx.location_id),
        priority: "normal".to_string(),
        purpose: Some("ward round".to_string()),
        needed_date: None,
        remarks: None,
    }
}

/// Event types for a request's timeline, oldest first.
pub async fn event_types_for(pool: &PgPool, request_id: DbId) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT event_type FROM request_events
         WHERE case_note_request_id = $1
         ORDER BY occurred_at ASC, id ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
    .unwrap()
}
