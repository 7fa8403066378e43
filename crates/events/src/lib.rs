//! CaseTrack domain-event infrastructure.
//!
//! The engine appends audit events to the database inside each command's
//! transaction; this crate is the *notification* side only, published to
//! after commit:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] — the canonical post-commit event envelope.
//! - [`DispatchLog`] — subscriber task standing where the external
//!   notification dispatcher attaches.
//!
//! Delivery is fire-and-forget: a failure to notify never affects the
//! state transition that produced the event.

pub mod bus;
pub mod dispatch;

pub use bus::{DomainEvent, EventBus};
pub use dispatch::DispatchLog;
