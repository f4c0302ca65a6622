//! # Event subscribers for the rendervisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for handling runtime events broadcast through
//! the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Dispatcher/handlers ── publish(Event) ──► Bus ──► SubscriberSet listener
//!                                                          │
//!                                                          ▼
//!                                              per-subscriber bounded queues
//!                                              ┌─────────┬─────────┬───────┐
//!                                              ▼         ▼         ▼       ▼
//!                                            LogWriter  Metrics  Custom  ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use rendervisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct MetricsSubscriber;
//!
//! #[async_trait]
//! impl Subscribe for MetricsSubscriber {
//!     async fn on_event(&self, event: &Event) {
//!         match event.kind {
//!             EventKind::RenderFailed => {
//!                 // increment failure counter
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
