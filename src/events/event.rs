//! # Runtime events emitted by dispatchers, handlers and the worker pool.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Subscriber events**: fan-out plumbing failures (overflow, panic)
//! - **Shutdown events**: pool drain progress (requested, stopped, grace exceeded)
//! - **Dispatch events**: per-request flow (received, failed, completed, abandoned)
//! - **Worker events**: dispatcher thread lifecycle (started, stopped)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! request correlation id, the worker index, response status and the gate limit.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use rendervisor::{Event, EventKind, RequestId};
//!
//! let ev = Event::new(EventKind::RenderFailed)
//!     .with_request(RequestId::new(7))
//!     .with_reason("boom")
//!     .with_status(500);
//!
//! assert_eq!(ev.kind, EventKind::RenderFailed);
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! assert_eq!(ev.status, Some(500));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::host::RequestId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Log level associated with an [`EventKind`].
///
/// Levels are ordered (`Trace < Debug < Info < Warn < Error`) so subscribers
/// can filter with a simple comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: panic info/message (prefixed with the subscriber name)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: reason string (e.g., "full", "closed")
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberOverflow,

    // === Shutdown events ===
    /// Pool shutdown requested; workers are being retired.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AllWorkersStopped,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets:
    /// - `reason`: number of stuck workers
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,

    // === Dispatch events ===
    /// Host configuration fetched (or defaulted) before intake started.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ConfigLoaded,

    /// A request was fetched from the source and admitted.
    ///
    /// Sets:
    /// - `request`: correlation id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RequestReceived,

    /// Render routine failed or panicked; a substitute response was produced.
    ///
    /// Sets:
    /// - `request`: correlation id
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RenderFailed,

    /// Response delivered (or delivery attempted) and the slot released.
    ///
    /// Sets:
    /// - `request`: correlation id
    /// - `status`: response status code
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RequestCompleted,

    /// Response could not be delivered; the requester is gone or unknown.
    ///
    /// Sets:
    /// - `request`: correlation id
    /// - `reason`: delivery error label
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ResponseAbandoned,

    /// Admission gate reached its in-flight ceiling for the first time.
    ///
    /// Published once per gate, when the first caller has to wait.
    ///
    /// Sets:
    /// - `limit`: configured in-flight ceiling
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GateSaturated,

    // === Worker events ===
    /// Pool worker thread started and entered its dispatch loop.
    ///
    /// Sets:
    /// - `worker`: worker index
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    WorkerStarted,

    /// Pool worker thread stopped (retired or failed).
    ///
    /// Sets:
    /// - `worker`: worker index
    /// - `reason`: stop reason ("retired", or an error message)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    WorkerStopped,
}

impl EventKind {
    /// Maps the event kind to its log level.
    pub fn severity(&self) -> Severity {
        match self {
            EventKind::RequestReceived => Severity::Trace,
            EventKind::ConfigLoaded
            | EventKind::RequestCompleted
            | EventKind::ResponseAbandoned => Severity::Debug,
            EventKind::WorkerStarted
            | EventKind::WorkerStopped
            | EventKind::ShutdownRequested
            | EventKind::AllWorkersStopped => Severity::Info,
            EventKind::GateSaturated
            | EventKind::SubscriberOverflow
            | EventKind::GraceExceeded => Severity::Warn,
            EventKind::RenderFailed | EventKind::SubscriberPanicked => Severity::Error,
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Correlation id of the request, if applicable.
    pub request: Option<RequestId>,
    /// Index of the pool worker, if applicable.
    pub worker: Option<usize>,
    /// Response status code, if applicable.
    pub status: Option<u16>,
    /// Gate in-flight ceiling, if applicable.
    pub limit: Option<usize>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            request: None,
            worker: None,
            status: None,
            limit: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a request correlation id.
    #[inline]
    pub fn with_request(mut self, id: RequestId) -> Self {
        self.request = Some(id);
        self
    }

    /// Attaches a pool worker index.
    #[inline]
    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches a response status code.
    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a gate in-flight ceiling.
    #[inline]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
