//! Actor identity and reference-data guards.
//!
//! The actor arrives from the excluded authentication collaborator (the API
//! layer resolves a gateway header against `users`); the engine never
//! re-derives identity. Reference ids are checked for existence + active
//! before any command accepts them.

use sqlx::PgExecutor;

use casetrack_core::error::CoreError;
use casetrack_core::types::DbId;
use casetrack_db::models::user::{roles, User};
use casetrack_db::repositories::{DepartmentRepo, DoctorRepo, LocationRepo, UserRepo};

use crate::map_db_err;

/// The authenticated user a command runs as.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: DbId,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: DbId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }

    /// Whether the actor is Medical Records staff (or an admin, which
    /// carries MR powers).
    pub fn is_mr_staff(&self) -> bool {
        self.role == roles::MR || self.role == roles::ADMIN
    }
}

// ---------------------------------------------------------------------------
// Reference guards
// ---------------------------------------------------------------------------

pub(crate) async fn ensure_active_user(
    executor: impl PgExecutor<'_>,
    id: DbId,
) -> Result<User, CoreError> {
    UserRepo::find_active_by_id(executor, id)
        .await
        .map_err(map_db_err)?
        .ok_or(CoreError::ReferenceNotFound { entity: "User", id })
}

pub(crate) async fn ensure_active_department(
    executor: impl PgExecutor<'_>,
    id: DbId,
) -> Result<(), CoreError> {
    DepartmentRepo::find_active_by_id(executor, id)
        .await
        .map_err(map_db_err)?
        .map(|_| ())
        .ok_or(CoreError::ReferenceNotFound {
            entity: "Department",
            id,
        })
}

pub(crate) async fn ensure_active_location(
    executor: impl PgExecutor<'_>,
    id: Option<DbId>,
) -> Result<(), CoreError> {
    let Some(id) = id else { return Ok(()) };
    LocationRepo::find_active_by_id(executor, id)
        .await
        .map_err(map_db_err)?
        .map(|_| ())
        .ok_or(CoreError::ReferenceNotFound {
            entity: "Location",
            id,
        })
}

pub(crate) async fn ensure_active_doctor(
    executor: impl PgExecutor<'_>,
    id: Option<DbId>,
) -> Result<(), CoreError> {
    let Some(id) = id else { return Ok(()) };
    DoctorRepo::find_active_by_id(executor, id)
        .await
        .map_err(map_db_err)?
        .map(|_| ())
        .ok_or(CoreError::ReferenceNotFound {
            entity: "Doctor",
            id,
        })
}
