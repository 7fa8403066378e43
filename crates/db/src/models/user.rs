//! User reference model.
//!
//! Users are maintained by the external administration surface; the engine
//! reads them for actor resolution and custody assignments only.

use serde::Serialize;
use sqlx::FromRow;

use casetrack_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Well-known role names.
pub mod roles {
    /// Clinic Assistant: requests and physically holds case notes.
    pub const CA: &str = "ca";
    /// Medical Records staff: approves requests, verifies returns/handovers.
    pub const MR: &str = "mr";
    pub const ADMIN: &str = "admin";
}
