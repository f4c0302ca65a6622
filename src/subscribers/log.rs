//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [debug] config-loaded
//! [trace] request-received id=42
//! [error] render-failed id=42 reason="boom"
//! [debug] request-completed id=42 status=200
//! [warn]  gate-saturated limit=1000
//! [info]  worker-started worker=0
//! [info]  worker-stopped worker=0 reason="retired"
//! [info]  shutdown-requested
//! [info]  all-workers-stopped
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use rendervisor::{Bus, LogWriter, SubscriberSet};
//! # async fn wire(bus: Bus) {
//! let subs = Arc::new(SubscriberSet::new(vec![Arc::new(LogWriter)], bus.clone()));
//! subs.spawn_listener(&bus);
//! // LogWriter will print all events to stdout
//! # }
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event descriptions
/// to stdout for debugging and demonstration purposes, prefixed with the
/// event's [`Severity`](crate::Severity).
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let sev = e.kind.severity();
        match e.kind {
            EventKind::ConfigLoaded => println!("[{sev}] config-loaded"),
            EventKind::RequestReceived => {
                if let Some(id) = e.request {
                    println!("[{sev}] request-received id={id}");
                }
            }
            EventKind::RenderFailed => {
                if let (Some(id), Some(reason)) = (e.request, &e.reason) {
                    println!("[{sev}] render-failed id={id} reason={:?}", &**reason);
                }
            }
            EventKind::RequestCompleted => {
                if let (Some(id), Some(status)) = (e.request, e.status) {
                    println!("[{sev}] request-completed id={id} status={status}");
                }
            }
            EventKind::ResponseAbandoned => {
                if let (Some(id), Some(reason)) = (e.request, &e.reason) {
                    println!("[{sev}] response-abandoned id={id} reason={:?}", &**reason);
                }
            }
            EventKind::GateSaturated => {
                if let Some(limit) = e.limit {
                    println!("[{sev}] gate-saturated limit={limit}");
                }
            }
            EventKind::WorkerStarted => {
                if let Some(w) = e.worker {
                    println!("[{sev}] worker-started worker={w}");
                }
            }
            EventKind::WorkerStopped => {
                if let (Some(w), Some(reason)) = (e.worker, &e.reason) {
                    println!("[{sev}] worker-stopped worker={w} reason={:?}", &**reason);
                }
            }
            EventKind::ShutdownRequested => {
                println!("[{sev}] shutdown-requested");
            }
            EventKind::AllWorkersStopped => {
                println!("[{sev}] all-workers-stopped");
            }
            EventKind::GraceExceeded => match &e.reason {
                Some(reason) => println!("[{sev}] grace-exceeded reason={:?}", &**reason),
                None => println!("[{sev}] grace-exceeded"),
            },
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                if let Some(reason) = &e.reason {
                    println!("[{sev}] subscriber reason={:?}", &**reason);
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
