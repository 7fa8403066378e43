//! CaseTrack domain core.
//!
//! Pure domain logic shared by the database, engine, API, and worker crates:
//! status vocabularies and transition rules, the audit event-type registry,
//! identifier formatting, batch roll-up math, and the event replay
//! projection. This crate performs no I/O.

pub mod batch;
pub mod error;
pub mod events;
pub mod handover;
pub mod numbering;
pub mod replay;
pub mod status;
pub mod types;
