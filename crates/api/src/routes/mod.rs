//! Route definitions, one module per resource.

pub mod batches;
pub mod handover_requests;
pub mod handovers;
pub mod health;
pub mod requests;
