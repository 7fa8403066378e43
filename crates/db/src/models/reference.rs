//! Department, location, and doctor reference models.

use serde::Serialize;
use sqlx::FromRow;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `departments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Department {
    pub id: DbId,
    pub name: String,
    pub code: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `locations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: DbId,
    pub department_id: Option<DbId>,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `doctors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Doctor {
    pub id: DbId,
    pub department_id: Option<DbId>,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
