//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `impl PgExecutor<'_>` as the first argument — a pool for
//! standalone reads, or `&mut *tx` to participate in the engine's
//! one-transaction-per-command discipline.

pub mod batch_repo;
pub mod handover_repo;
pub mod handover_request_repo;
pub mod reference_repo;
pub mod request_event_repo;
pub mod request_repo;
pub mod sequence_repo;
pub mod user_repo;

pub use batch_repo::BatchRepo;
pub use handover_repo::HandoverRepo;
pub use handover_request_repo::HandoverRequestRepo;
pub use reference_repo::{DepartmentRepo, DoctorRepo, LocationRepo};
pub use request_event_repo::RequestEventRepo;
pub use request_repo::RequestRepo;
pub use sequence_repo::SequenceRepo;
pub use user_repo::UserRepo;
