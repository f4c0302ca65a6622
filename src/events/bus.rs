//! # Event bus: broadcast fan-in for runtime events.
//!
//! [`Bus`] wraps a [`tokio::sync::broadcast`] channel so every stage of the
//! runtime can publish without blocking and without knowing who listens.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Subscriber (one per listener):
//!   Dispatcher  ──┐
//!   Handler 1   ──┼──────► Bus ───────► SubscriberSet listener ───► Subscribe impls
//!   Handler N   ──┤  (broadcast chan)
//!   Pool superv ──┘
//! ```
//!
//! rendervisor fans events out to user-defined subscribers via
//! [`SubscriberSet`](crate::SubscriberSet) listeners spawned on the bus.
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no active receiver the
//!   event is dropped.
//! - One bounded ring buffer is shared by all receivers. A receiver that
//!   falls more than `capacity` events behind observes `Lagged(n)` once and
//!   resumes at the oldest retained event.
//! - A receiver only sees events sent after its `subscribe()` call.
//! - Events are not persisted anywhere.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publish/subscribe handle over one broadcast channel.
///
/// Cloning is cheap (the sender is `Arc`-backed); all clones publish into
/// the same ring buffer. Pool workers each carry a clone across threads.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to every active receiver.
    ///
    /// The channel clones the event per receiver; with no receiver it is
    /// dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
