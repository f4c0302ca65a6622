//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the dispatcher, handler
//! tasks, admission gate, pool supervisor and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Severity`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher`, per-request handler tasks, `AdmissionGate`
//!   (saturation), pool supervisor/workers, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `SubscriberSet::spawn_listener()` (fans out to registered
//!   `Subscribe` impls).
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Severity};
