//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for watching the render runtime. Each
//! subscriber is driven by a dedicated worker loop fed by a bounded queue
//! owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, retries); the dispatch
//!   loop and the other subscribers never wait on them.
//! - Each subscriber sizes its own queue via [`Subscribe::queue_capacity`].
//!   A full queue drops events for that subscriber only, with a
//!   `SubscriberOverflow` warn on the bus.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use rendervisor::{Event, EventKind, Subscribe};
//!
//! /// Counts failed renders; a real subscriber might page someone.
//! #[derive(Default)]
//! struct FailureCounter {
//!     failed: AtomicU64,
//! }
//!
//! #[async_trait::async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::RenderFailed) {
//!             self.failed.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failure-counter"
//!     }
//!
//!     fn queue_capacity(&self) -> usize {
//!         512
//!     }
//! }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// Contract for event subscribers.
///
/// Runs on a dedicated worker task; keep the runtime responsive by using
/// async I/O rather than blocking calls.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    ///
    /// The event is borrowed; clone whatever outlives the call.
    async fn on_event(&self, event: &Event);

    /// Stable name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue; overflowing events are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
