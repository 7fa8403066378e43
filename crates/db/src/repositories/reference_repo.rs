//! Repositories for the department/location/doctor reference tables.
//!
//! Reference data is maintained externally; the engine only checks
//! existence and the active flag before accepting an id.

use sqlx::PgExecutor;

use casetrack_core::types::DbId;

use crate::models::reference::{Department, Doctor, Location};

const DEPARTMENT_COLUMNS: &str = "id, name, code, is_active, created_at, updated_at";
const LOCATION_COLUMNS: &str = "id, department_id, name, is_active, created_at, updated_at";
const DOCTOR_COLUMNS: &str = "id, department_id, name, is_active, created_at, updated_at";

/// Read-only access to departments.
pub struct DepartmentRepo;

impl DepartmentRepo {
    /// Find an active department by id.
    pub async fn find_active_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query =
            format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1 AND is_active = TRUE");
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}

/// Read-only access to locations.
pub struct LocationRepo;

impl LocationRepo {
    /// Find an active location by id.
    pub async fn find_active_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Location>, sqlx::Error> {
        let query =
            format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1 AND is_active = TRUE");
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}

/// Read-only access to doctors.
pub struct DoctorRepo;

impl DoctorRepo {
    /// Find an active doctor by id.
    pub async fn find_active_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Doctor>, sqlx::Error> {
        let query =
            format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = $1 AND is_active = TRUE");
        sqlx::query_as::<_, Doctor>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
