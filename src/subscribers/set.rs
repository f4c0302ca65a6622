//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] gives every subscriber its own bounded queue and worker
//! task, so one slow or broken subscriber never stalls the publisher or its
//! peers.
//!
//! ## Architecture
//! ```text
//! Bus ──► spawn_listener ──► emit_arc(event)
//!                                │
//!                                ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!                                │    (bounded)         └──────► panic → SubscriberPanicked
//!                                ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!                                │    (bounded)
//!                                └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!                                     (bounded)
//! ```
//!
//! ## Rules
//! - Fan-out is `try_send`: a full queue drops the event for that subscriber
//!   only and publishes `SubscriberOverflow` (overflow events themselves are
//!   never re-published, so the bus cannot feed back on itself).
//! - Each subscriber sees its events in order; there is no ordering across
//!   subscribers.
//! - A panicking `on_event` is caught, reported as `SubscriberPanicked`, and
//!   the worker moves on to the next event.
//!
//! Panic containment relies on `AssertUnwindSafe`: a subscriber that panics
//! while holding a lock can leave its own shared state poisoned. That is the
//! subscriber's problem; the runtime keeps going.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Intake side of one subscriber's queue.
struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator: one bounded queue and one worker per subscriber.
///
/// Built once with the full subscriber list; wire it to a [`Bus`] with
/// [`spawn_listener`](Self::spawn_listener) or push events in directly with
/// [`emit`](Self::emit) / [`emit_arc`](Self::emit_arc).
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker task per subscriber.
    ///
    /// Each queue is bounded by that subscriber's
    /// [`queue_capacity`](Subscribe::queue_capacity) (minimum 1). Workers
    /// run until [`shutdown`](Self::shutdown) closes their queue. The bus is
    /// where overflow and panic reports go.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            lanes.push(Lane {
                name: sub.name(),
                tx,
            });
            workers.push(tokio::spawn(drive(sub, rx, bus.clone())));
        }

        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Subscribes to the bus and pumps every event into this set.
    ///
    /// Spawns the listener on the current runtime and returns its handle.
    /// The listener runs until the bus is dropped (no publishers remain).
    ///
    /// ### Notes
    /// - A lagged receiver skips the missed events and keeps going; skipped
    ///   events are simply not fanned out.
    /// - Call once per set. A second listener on the same set would deliver
    ///   every event twice to every subscriber queue.
    pub fn spawn_listener(self: &Arc<Self>, bus: &Bus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let set = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Emits a borrowed event to every subscriber queue.
    ///
    /// Clones once into an `Arc`; prefer [`emit_arc`](Self::emit_arc) when
    /// the event is already shared.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a shared event to every subscriber queue without blocking.
    ///
    /// A queue that is full (or whose worker is gone) drops the event for
    /// that subscriber and a `SubscriberOverflow` is published, unless the
    /// event itself is an overflow report.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for lane in &self.lanes {
            let reason = match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus.publish(Event::subscriber_overflow(lane.name, reason));
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Closes every queue, then waits for the workers to finish.
    ///
    /// Workers drain what is already queued before exiting, so every event
    /// accepted by `emit` is still delivered.
    pub async fn shutdown(self) {
        drop(self.lanes);

        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Worker loop for one subscriber: deliver until the queue closes.
async fn drive(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let delivery = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()));
        if let Err(panic_err) = delivery.catch_unwind().await {
            let info = panic_text(panic_err.as_ref());
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}

fn panic_text(err: &(dyn Any + Send)) -> String {
    if let Some(msg) = err.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = err.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    struct Counter {
        name: &'static str,
        capacity: usize,
        seen: AtomicUsize,
    }

    impl Counter {
        fn new(name: &'static str, capacity: usize) -> Arc<Self> {
            Arc::new(Self {
                name,
                capacity,
                seen: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn queue_capacity(&self) -> usize {
            self.capacity
        }
    }

    /// Panics on the first event, counts the rest.
    struct FlakyOnce {
        tripped: AtomicUsize,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for FlakyOnce {
        async fn on_event(&self, _ev: &Event) {
            if self.tripped.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("subscriber blew up");
            }
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_every_event() {
        let bus = Bus::new(16);
        let a = Counter::new("a", 8);
        let b = Counter::new("b", 8);
        let set = SubscriberSet::new(vec![a.clone(), b.clone()], bus);

        for _ in 0..3 {
            set.emit(&Event::new(EventKind::ConfigLoaded));
        }
        set.shutdown().await;

        assert_eq!(a.seen.load(Ordering::SeqCst), 3);
        assert_eq!(b.seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_overflow_drops_for_that_subscriber_and_reports() {
        let bus = Bus::new(16);
        let mut reports = bus.subscribe();
        let slow = Counter::new("slow", 1);
        let set = SubscriberSet::new(vec![slow.clone()], bus);

        // The worker has not polled yet, so the second emit finds the
        // one-slot queue still full.
        set.emit(&Event::new(EventKind::ConfigLoaded));
        set.emit(&Event::new(EventKind::ConfigLoaded));
        set.shutdown().await;

        assert_eq!(slow.seen.load(Ordering::SeqCst), 1, "second event dropped");

        let overflow = reports.try_recv().ok();
        assert!(
            overflow.as_ref().is_some_and(Event::is_subscriber_overflow),
            "a SubscriberOverflow report must reach the bus"
        );
        assert_eq!(
            overflow.and_then(|ev| ev.reason).as_deref(),
            Some("subscriber=slow reason=full")
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported_and_keeps_running() {
        let bus = Bus::new(16);
        let mut reports = bus.subscribe();
        let flaky = Arc::new(FlakyOnce {
            tripped: AtomicUsize::new(0),
            seen: AtomicUsize::new(0),
        });
        let set = SubscriberSet::new(vec![flaky.clone() as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::ConfigLoaded));
        set.emit(&Event::new(EventKind::ConfigLoaded));
        set.shutdown().await;

        assert_eq!(
            flaky.seen.load(Ordering::SeqCst),
            1,
            "the worker must survive the panic and deliver the next event"
        );

        let mut panicked = None;
        while let Ok(ev) = reports.try_recv() {
            if ev.is_subscriber_panic() {
                panicked = ev.reason;
            }
        }
        assert_eq!(
            panicked.as_deref(),
            Some("subscriber=flaky panic=subscriber blew up")
        );
    }

    #[tokio::test]
    async fn test_listener_pumps_bus_events_into_the_set() {
        let bus = Bus::new(16);
        let counter = Counter::new("pump", 8);
        let set = Arc::new(SubscriberSet::new(
            vec![counter.clone() as Arc<dyn Subscribe>],
            bus.clone(),
        ));
        let _listener = set.spawn_listener(&bus);

        bus.publish(Event::new(EventKind::ConfigLoaded));
        bus.publish(Event::new(EventKind::ShutdownRequested));
        settle().await;

        assert_eq!(counter.seen.load(Ordering::SeqCst), 2);
    }
}
