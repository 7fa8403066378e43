//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//!
//! `request_event` has no update DTO: the audit log is append-only.

pub mod batch;
pub mod handover;
pub mod handover_request;
pub mod reference;
pub mod request;
pub mod request_event;
pub mod sequence;
pub mod user;
