//! # rendervisor
//!
//! **Rendervisor** is a server-side render dispatch library for Rust.
//!
//! It takes a stream of render requests from a host, bounds how many are
//! in flight, runs each one as an isolated single-threaded task, and
//! guarantees every admitted request exactly one response. Renderers may
//! be `!Send` (an embedded scripting engine, a thread-local template
//! cache); nothing in the dispatch path requires crossing threads.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!      ┌────────────┐      ┌────────────┐      ┌────────────┐
//!      │ host task  │      │ host task  │      │ host task  │
//!      │ (request)  │      │ (request)  │      │ (request)  │
//!      └─────┬──────┘      └─────┬──────┘      └─────┬──────┘
//!            ▼                   ▼                   ▼
//!  ┌─────────────────────────────────────────────────────────┐
//!  │  RenderHandle ── bounded queue ──► ChannelHost          │
//!  │  (one oneshot per request, pending map by RequestId)    │
//!  └───────────────────────────┬─────────────────────────────┘
//!                              ▼ RequestSource
//!  ┌─────────────────────────────────────────────────────────┐
//!  │  Dispatcher (single-threaded loop)                      │
//!  │  - AdmissionGate (ready / up / down, FIFO waiters)      │
//!  │  - one spawned handler per admitted request             │
//!  └──────┬──────────────────┬──────────────────┬────────────┘
//!         ▼                  ▼                  ▼
//!    handle(r1)         handle(r2)         handle(r3)
//!  render ► deliver   render ► deliver   render ► deliver
//!         │                  │                  │
//!         └────── events ────┴──── events ──────┘
//!                              ▼
//!  ┌─────────────────────────────────────────────────────────┐
//!  │                 Bus (broadcast channel)                 │
//!  └───────────────────────────┬─────────────────────────────┘
//!                              ▼
//!                       SubscriberSet ──► sub.on_event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! channel() ──► ChannelHost ──► Dispatcher::run(token)
//!
//! INIT:
//!   ├─► config = source.configuration()?   (None ─► {})
//!   └─► publish ConfigLoaded
//!
//! loop {
//!   ├─► gate.ready()             (parks while in_flight == limit)
//!   ├─► source.next_request()    (Err ─► fatal: drain, return Err)
//!   ├─► gate.up()
//!   └─► spawn handle(request):
//!         ├─► publish RequestReceived
//!         ├─► render under catch_unwind
//!         │     ├─ Ok        ─► response (missing parts defaulted)
//!         │     └─ Err/panic ─► publish RenderFailed ─► 500 substitute
//!         ├─► sink.send_response(id, response)
//!         │     └─ Err ─► publish ResponseAbandoned (non-fatal)
//!         ├─► publish RequestCompleted
//!         └─► gate.down()
//! }
//!
//! On cancel: stop intake, drain in-flight handlers, return Ok
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                            |
//! |-------------------|----------------------------------------------------------------------|-----------------------------------------------|
//! | **Dispatch**      | Bounded, failure-isolated request dispatch on one thread.            | [`Dispatcher`], [`AdmissionGate`]             |
//! | **Host bridge**   | Feed requests in, get responses back, as traits or ready channels.   | [`RequestSource`], [`ResponseSink`], [`RenderHandle`] |
//! | **Rendering**     | Define render routines as trait impls or closures.                   | [`Render`], [`RenderFn`], [`Rendered`]        |
//! | **Templates**     | Substitute rendered fields into an index page.                       | [`PageTemplate`]                              |
//! | **Events**        | Structured lifecycle events on a broadcast bus.                      | [`Event`], [`Bus`], [`Subscribe`]             |
//! | **Errors**        | Typed errors per failure class.                                      | [`RenderError`], [`HostError`], [`SubmitError`] |
//! | **Configuration** | Centralize dispatch settings.                                        | [`DispatchConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//! - `pool`: exposes an elastic worker-thread pool ([`RenderPool`]).
//!
//! ## Example
//! ```rust
//! use std::rc::Rc;
//!
//! use tokio::task::LocalSet;
//! use tokio_util::sync::CancellationToken;
//!
//! use rendervisor::{
//!     channel, Bus, ChannelHost, DispatchConfig, Dispatcher, RenderFn, RenderRequest, Rendered,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Host side: a handle to submit requests, a receiver to serve them.
//!     let (handle, receiver) = channel(32);
//!     let host = Rc::new(ChannelHost::new(receiver, None));
//!     let bus = Bus::new(64);
//!
//!     // A render routine; closures work, so do `Render` impls.
//!     let renderer = RenderFn::rc(
//!         "hello",
//!         |req: RenderRequest, _cfg: serde_json::Value| async move {
//!             Ok(Rendered::default()
//!                 .with_status(200)
//!                 .with_field("body", format!("<h1>{}</h1>", req.uri)))
//!         },
//!     );
//!
//!     let dispatcher = Dispatcher::new(
//!         &DispatchConfig::default(),
//!         host.clone(),
//!         host.clone(),
//!         renderer,
//!         bus,
//!     );
//!     let token = CancellationToken::new();
//!
//!     let local = LocalSet::new();
//!     local
//!         .run_until(async {
//!             let run = tokio::task::spawn_local(dispatcher.run(token.clone()));
//!
//!             let response = handle.render(RenderRequest::get("/index")).await?;
//!             assert_eq!(response.status, 200);
//!
//!             token.cancel();
//!             run.await?.map_err(Into::into)
//!         })
//!         .await
//! }
//! ```
mod core;
mod error;
mod events;
mod host;
mod render;
mod subscribers;

// ---- Public re-exports ----

pub use core::{AdmissionGate, DispatchConfig, Dispatcher, DEFAULT_MAX_INFLIGHT};
pub use error::{DeliverError, HostError, RenderError, SubmitError};
pub use events::{Bus, Event, EventKind, Severity};
pub use host::{
    channel, ChannelHost, Incoming, RenderHandle, RequestId, RequestReceiver, RequestSource,
    ResponseSink,
};
pub use render::{
    PageTemplate, Render, RenderFn, RenderRef, RenderRequest, RenderResponse, Rendered,
    DEFAULT_STATUS,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the elastic worker-thread pool.
// Enable with: `--features pool`
#[cfg(feature = "pool")]
mod pool;
#[cfg(feature = "pool")]
pub use pool::{PoolConfig, RenderPool, RendererFactory};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
