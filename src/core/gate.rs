//! # AdmissionGate: cooperative in-flight ceiling.
//!
//! [`AdmissionGate`] bounds how many requests one dispatcher renders at a
//! time. The dispatch loop awaits [`ready`](AdmissionGate::ready) before
//! fetching, calls [`up`](AdmissionGate::up) when it dispatches, and every
//! handler calls [`down`](AdmissionGate::down) when it finishes.
//!
//! ## Protocol
//! ```text
//! loop:  ready().await ──► fetch ──► up() ──► spawn handler
//!                                                  │
//!                 waiter at the queue head ◄── down()   (handler, last step)
//! ```
//!
//! ## Rules
//! - `0 <= in_flight <= limit` holds under the protocol (one `up()` per
//!   successful `ready()`, one `down()` per `up()`).
//! - Waiters wake in FIFO order; `down()` wakes exactly the queue head,
//!   skipping entries whose future was dropped mid-wait.
//! - The first time a caller has to wait, the gate publishes one
//!   `GateSaturated` warn event; later saturations are silent.
//! - Unbalanced `down()` saturates at zero instead of underflowing.
//!
//! ## Threading
//! The gate is single-threaded (`RefCell` state): share it within one
//! dispatcher via `Rc`. Atomicity between the ready-check and the counter
//! updates comes from run-to-completion scheduling; no borrow is ever held
//! across an await point.

use std::cell::RefCell;
use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::events::{Bus, Event, EventKind};

/// Mutable gate state behind the `RefCell`.
struct GateState {
    in_flight: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
    warned: bool,
}

/// Concurrency ceiling for one dispatcher.
///
/// See the module docs for the ready/up/down protocol.
pub struct AdmissionGate {
    limit: usize,
    state: RefCell<GateState>,
    bus: Bus,
}

impl AdmissionGate {
    /// Creates a gate with the given ceiling (clamped to a minimum of 1).
    pub fn new(limit: usize, bus: Bus) -> Self {
        Self {
            limit: limit.max(1),
            state: RefCell::new(GateState {
                in_flight: 0,
                waiters: VecDeque::new(),
                warned: false,
            }),
            bus,
        }
    }

    /// Waits until the gate has capacity for one more admission.
    ///
    /// Returns immediately while `in_flight < limit`. At the limit, the
    /// caller is parked at the back of the FIFO waiter queue until a
    /// [`down`](AdmissionGate::down) wakes it. Dropping the returned future
    /// mid-wait is safe; the stale queue entry is skipped on wake.
    pub async fn ready(&self) {
        let rx = {
            let mut state = self.state.borrow_mut();
            if state.in_flight < self.limit {
                return;
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);

            let first = !state.warned;
            state.warned = true;
            drop(state);

            if first {
                self.bus
                    .publish(Event::new(EventKind::GateSaturated).with_limit(self.limit));
            }
            rx
        };

        // Err would mean the gate dropped the sender; either way the slot
        // check happens on the next loop iteration, so just resume.
        let _ = rx.await;
    }

    /// Records one admission. Paired with exactly one later [`down`](AdmissionGate::down).
    pub fn up(&self) {
        self.state.borrow_mut().in_flight += 1;
    }

    /// Records one completion and wakes the next live waiter, if any.
    pub fn down(&self) {
        let mut state = self.state.borrow_mut();
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.in_flight >= self.limit {
            return;
        }

        while let Some(tx) = state.waiters.pop_front() {
            if tx.send(()).is_ok() {
                break;
            }
        }
    }

    /// Number of admissions currently outstanding.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight
    }

    /// The configured ceiling.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// True while the ceiling is reached.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.in_flight() >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn gate(limit: usize) -> AdmissionGate {
        AdmissionGate::new(limit, Bus::new(8))
    }

    #[test]
    fn test_ready_is_immediate_below_limit() {
        let g = gate(2);
        assert!(g.ready().now_or_never().is_some());
        g.up();
        assert!(g.ready().now_or_never().is_some());
        g.up();
        assert_eq!(g.in_flight(), 2);
    }

    #[test]
    fn test_ready_blocks_at_limit_until_down() {
        let g = gate(1);
        g.ready().now_or_never().unwrap();
        g.up();
        assert!(g.is_saturated());

        let mut waiting = Box::pin(g.ready());
        assert!(
            waiting.as_mut().now_or_never().is_none(),
            "ready() must block at the limit"
        );

        g.down();
        assert!(
            waiting.as_mut().now_or_never().is_some(),
            "down() must wake the waiter"
        );
    }

    #[test]
    fn test_waiters_wake_in_fifo_order() {
        let g = gate(1);
        g.ready().now_or_never().unwrap();
        g.up();

        let mut first = Box::pin(g.ready());
        let mut second = Box::pin(g.ready());
        assert!(first.as_mut().now_or_never().is_none());
        assert!(second.as_mut().now_or_never().is_none());

        g.down();
        assert!(
            second.as_mut().now_or_never().is_none(),
            "second waiter must not overtake the first"
        );
        assert!(first.as_mut().now_or_never().is_some());

        g.up();
        g.down();
        assert!(second.as_mut().now_or_never().is_some());
    }

    #[test]
    fn test_dropped_waiter_never_strands_a_live_one() {
        let g = gate(1);
        g.ready().now_or_never().unwrap();
        g.up();

        let mut dead = Box::pin(g.ready());
        assert!(dead.as_mut().now_or_never().is_none());
        let mut live = Box::pin(g.ready());
        assert!(live.as_mut().now_or_never().is_none());
        drop(dead);

        g.down();
        assert!(
            live.as_mut().now_or_never().is_some(),
            "down() must skip the dropped waiter"
        );
    }

    #[test]
    fn test_saturation_warn_is_published_once() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let g = AdmissionGate::new(1, bus);

        g.ready().now_or_never().unwrap();
        g.up();

        let mut w1 = Box::pin(g.ready());
        assert!(w1.as_mut().now_or_never().is_none());
        g.down();
        assert!(w1.as_mut().now_or_never().is_some());

        g.up();
        let mut w2 = Box::pin(g.ready());
        assert!(w2.as_mut().now_or_never().is_none(), "gate saturated again");

        let mut saturated = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev.kind, EventKind::GateSaturated) {
                assert_eq!(ev.limit, Some(1));
                saturated += 1;
            }
        }
        assert_eq!(
            saturated, 1,
            "saturation warn must be latched to the first occurrence"
        );
    }

    #[test]
    fn test_zero_limit_is_clamped_to_one() {
        let g = gate(0);
        assert_eq!(g.limit(), 1);
        assert!(g.ready().now_or_never().is_some());
    }

    #[test]
    fn test_unbalanced_down_saturates_at_zero() {
        let g = gate(1);
        g.down();
        assert_eq!(g.in_flight(), 0);
    }

    #[test]
    fn test_protocol_interleavings_respect_bounds() {
        let g = gate(3);
        for _ in 0..3 {
            g.ready().now_or_never().unwrap();
            g.up();
            assert!(g.in_flight() <= g.limit());
        }
        assert!(g.is_saturated());

        g.down();
        assert_eq!(g.in_flight(), 2);
        g.ready().now_or_never().unwrap();
        g.up();
        assert_eq!(g.in_flight(), 3);

        for _ in 0..3 {
            g.down();
        }
        assert_eq!(g.in_flight(), 0);
    }
}
