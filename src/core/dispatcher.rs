//! # Dispatch loop: serialized intake, concurrent handling.
//!
//! [`Dispatcher`] owns the render side of the bridge. It pulls requests from
//! a [`RequestSource`] one at a time, admits each through the
//! [`AdmissionGate`], and spawns an independent handler task per request on
//! the current thread. Handlers render, deliver through the [`ResponseSink`],
//! and release their gate slot; the loop itself never renders and never
//! waits on a handler to fetch the next request.
//!
//! ```text
//!                      ┌────────────────────────────────┐
//!  RequestSource ────► │           Dispatcher           │
//!                      │  ready ─► next_request ─► up   │
//!                      └───────────────┬────────────────┘
//!                                      │ spawn_local
//!                        ┌─────────────┼─────────────┐
//!                        ▼             ▼             ▼
//!                    handle(r1)    handle(r2)    handle(r3)
//!                        │             │             │
//!                        ▼             ▼             ▼
//!                   ResponseSink  ResponseSink  ResponseSink
//!                        └──────── gate.down() ───────┘
//! ```
//!
//! ## Rules
//! - Intake is strictly serial: admission is confirmed before the next
//!   request is fetched, so the source is never drained past the ceiling.
//! - A render failure or panic is the handler's problem; the loop keeps
//!   dispatching.
//! - Cancellation stops intake only. Handlers already spawned run to
//!   completion and deliver their responses before [`Dispatcher::run`]
//!   returns.
//! - A source failure is fatal: intake stops and the error is returned,
//!   but only after the in-flight drain.

use std::rc::Rc;

use serde_json::{Map, Value};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::core::config::DispatchConfig;
use crate::core::gate::AdmissionGate;
use crate::core::handler;
use crate::error::HostError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{RequestSource, ResponseSink};
use crate::render::RenderRef;

/// Shared state handed to every spawned handler.
///
/// Built once per [`Dispatcher::run`] and cloned by `Rc`, so handlers see
/// the same configuration blob, gate, sink and bus without re-threading
/// five arguments through every call.
pub(crate) struct DispatchContext {
    /// Host configuration blob, `{}` when the host supplied none.
    pub(crate) config: Value,
    pub(crate) gate: Rc<AdmissionGate>,
    pub(crate) sink: Rc<dyn ResponseSink>,
    pub(crate) renderer: RenderRef,
    pub(crate) bus: Bus,
}

/// Single-threaded request dispatch loop.
///
/// Construct with [`Dispatcher::new`], then drive with [`Dispatcher::run`]
/// inside a `LocalSet`. The dispatcher is not `Send`: requests, handlers
/// and the renderer all stay on the thread that runs it.
pub struct Dispatcher {
    source: Rc<dyn RequestSource>,
    sink: Rc<dyn ResponseSink>,
    renderer: RenderRef,
    gate: Rc<AdmissionGate>,
    bus: Bus,
}

impl Dispatcher {
    /// Creates a dispatcher over the given source, sink and renderer.
    ///
    /// The admission gate is built here from `config.max_inflight`; a zero
    /// ceiling is clamped to 1.
    pub fn new(
        config: &DispatchConfig,
        source: Rc<dyn RequestSource>,
        sink: Rc<dyn ResponseSink>,
        renderer: RenderRef,
        bus: Bus,
    ) -> Self {
        let gate = Rc::new(AdmissionGate::new(config.max_inflight, bus.clone()));
        Self {
            source,
            sink,
            renderer,
            gate,
            bus,
        }
    }

    /// Returns the admission gate driving this dispatcher.
    ///
    /// Useful for observing `in_flight` from the outside; the returned
    /// handle shares state with the running loop.
    #[must_use]
    pub fn gate(&self) -> Rc<AdmissionGate> {
        Rc::clone(&self.gate)
    }

    /// Runs the dispatch loop until cancellation or a source failure.
    ///
    /// Fetches the host configuration first (`{}` when the host has none),
    /// publishes [`EventKind::ConfigLoaded`], then loops: wait for gate
    /// capacity, fetch one request, count it in, spawn its handler. On
    /// cancellation the loop returns `Ok(())`; on a source failure it
    /// returns the error. Either way, every already-spawned handler is
    /// awaited before returning, so no admitted request is abandoned.
    ///
    /// # Panics
    ///
    /// Must be called from within a [`tokio::task::LocalSet`] (handlers are
    /// spawned with `spawn_local`).
    pub async fn run(self, token: CancellationToken) -> Result<(), HostError> {
        let config = self
            .source
            .configuration()
            .await?
            .unwrap_or_else(|| Value::Object(Map::new()));

        self.bus.publish(Event::new(EventKind::ConfigLoaded));

        let ctx = Rc::new(DispatchContext {
            config,
            gate: Rc::clone(&self.gate),
            sink: Rc::clone(&self.sink),
            renderer: Rc::clone(&self.renderer),
            bus: self.bus.clone(),
        });

        let mut handlers: JoinSet<()> = JoinSet::new();

        let result = loop {
            // Reap finished handlers so the set does not grow without
            // bound under sustained load.
            while handlers.try_join_next().is_some() {}

            tokio::select! {
                _ = token.cancelled() => break Ok(()),
                // A wait abandoned here leaves a dead waiter in the gate
                // queue; `down` skips those when waking.
                _ = self.gate.ready() => {}
            }

            let incoming = tokio::select! {
                _ = token.cancelled() => break Ok(()),
                fetched = self.source.next_request() => match fetched {
                    Ok(incoming) => incoming,
                    Err(err) => break Err(err),
                },
            };

            self.gate.up();
            handlers.spawn_local(handler::handle(Rc::clone(&ctx), incoming));
        };

        // Intake has stopped; admitted requests still deliver.
        while handlers.join_next().await.is_some() {}

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::sync::oneshot;
    use tokio::task::LocalSet;

    use crate::error::RenderError;
    use crate::host::{channel, ChannelHost, RequestId};
    use crate::render::{RenderFn, RenderRequest, Rendered};

    fn config_with_limit(max_inflight: usize) -> DispatchConfig {
        DispatchConfig { max_inflight }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_every_request_gets_exactly_one_response() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);
                let renderer = RenderFn::rc("echo", |req: RenderRequest, _cfg: Value| async move {
                    Ok(Rendered::default().with_status(200).with_field("body", req.uri))
                });
                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let mut clients = Vec::new();
                for i in 0..5 {
                    let handle = handle.clone();
                    clients.push(tokio::task::spawn_local(async move {
                        handle.render(RenderRequest::get(format!("/page/{i}"))).await
                    }));
                }

                let mut bodies = Vec::new();
                for client in clients {
                    let response = client.await.unwrap().unwrap();
                    assert_eq!(response.status, 200, "echo renderer reports 200");
                    bodies.push(response.fields.get("body").cloned().unwrap());
                }
                bodies.sort();
                bodies.dedup();
                assert_eq!(bodies.len(), 5, "each request got its own response body");

                token.cancel();
                let res = run.await.unwrap();
                assert!(res.is_ok(), "cancelled run exits cleanly: {res:?}");
            })
            .await;
    }

    #[tokio::test]
    async fn test_intake_pauses_at_the_ceiling() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let backlog = receiver.clone();
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);

                let (release_tx, release_rx) = flume::unbounded::<()>();
                let renderer = RenderFn::rc("hold", move |_req: RenderRequest, _cfg: Value| {
                    let release = release_rx.clone();
                    async move {
                        let _ = release.recv_async().await;
                        Ok(Rendered::default().with_status(200))
                    }
                });

                let dispatcher = Dispatcher::new(
                    &config_with_limit(2),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let gate = dispatcher.gate();
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let mut clients = Vec::new();
                for i in 0..3 {
                    let handle = handle.clone();
                    clients.push(tokio::task::spawn_local(async move {
                        handle.render(RenderRequest::get(format!("/slow/{i}"))).await
                    }));
                }

                settle().await;
                assert_eq!(gate.in_flight(), 2, "two requests admitted at ceiling 2");
                assert!(gate.is_saturated(), "gate reports saturation");
                assert_eq!(backlog.len(), 1, "third request stays queued in the source");

                release_tx.send(()).unwrap();
                settle().await;
                assert_eq!(gate.in_flight(), 2, "freed slot admits the queued request");
                assert_eq!(backlog.len(), 0, "source drained once capacity freed");

                release_tx.send(()).unwrap();
                release_tx.send(()).unwrap();
                for client in clients {
                    let response = client.await.unwrap().unwrap();
                    assert_eq!(response.status, 200, "held request still completed");
                }

                token.cancel();
                run.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_render_failure_yields_substitute_response() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);
                let renderer = RenderFn::rc("flaky", |req: RenderRequest, _cfg: Value| async move {
                    if req.uri == "/boom" {
                        Err(RenderError::failed("boom"))
                    } else {
                        Ok(Rendered::default().with_status(200))
                    }
                });
                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let failed = handle.render(RenderRequest::get("/boom")).await.unwrap();
                assert_eq!(failed.status, 500, "failed render delivers the substitute");
                assert_eq!(failed.fields.get("head").map(String::as_str), Some(""));
                assert_eq!(failed.fields.get("body").map(String::as_str), Some("boom"));

                let ok = handle.render(RenderRequest::get("/fine")).await.unwrap();
                assert_eq!(ok.status, 200, "loop keeps dispatching after a failure");

                token.cancel();
                run.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_render_panic_is_contained() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);
                let renderer = RenderFn::rc("panicky", |req: RenderRequest, _cfg: Value| async move {
                    if req.uri == "/boom" {
                        panic!("kaboom");
                    }
                    Ok(Rendered::default().with_status(200))
                });
                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let panicked = handle.render(RenderRequest::get("/boom")).await.unwrap();
                assert_eq!(panicked.status, 500, "panicking render delivers the substitute");
                assert!(
                    panicked.fields.get("body").unwrap().contains("kaboom"),
                    "panic payload lands in the substitute body"
                );

                let ok = handle.render(RenderRequest::get("/fine")).await.unwrap();
                assert_eq!(ok.status, 200, "loop survives a renderer panic");

                token.cancel();
                run.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_missing_configuration_defaults_to_empty_object() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);
                let renderer = RenderFn::rc("cfg", |_req: RenderRequest, cfg: Value| async move {
                    Ok(Rendered::default()
                        .with_status(200)
                        .with_field("config", cfg.to_string()))
                });
                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let response = handle.render(RenderRequest::get("/")).await.unwrap();
                assert_eq!(
                    response.fields.get("config").map(String::as_str),
                    Some("{}"),
                    "absent host configuration is presented as an empty object"
                );

                token.cancel();
                run.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_lifecycle_events_follow_the_request() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);
                let mut rx = bus.subscribe();
                let renderer = RenderFn::rc("boom", |_req: RenderRequest, _cfg: Value| async move {
                    Err::<Rendered, _>(RenderError::failed("boom"))
                });
                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let response = handle.render(RenderRequest::get("/boom")).await.unwrap();
                assert_eq!(response.status, 500);

                token.cancel();
                run.await.unwrap().unwrap();

                let mut events = Vec::new();
                while let Ok(ev) = rx.try_recv() {
                    events.push(ev);
                }
                let kinds: Vec<EventKind> = events.iter().map(|ev| ev.kind).collect();
                assert_eq!(
                    kinds,
                    vec![
                        EventKind::ConfigLoaded,
                        EventKind::RequestReceived,
                        EventKind::RenderFailed,
                        EventKind::RequestCompleted,
                    ],
                    "events trace the request in publish order"
                );
                assert_eq!(
                    events[1].request,
                    Some(RequestId::new(0)),
                    "received event carries the request id"
                );
                assert_eq!(
                    events[2].reason.as_deref(),
                    Some("boom"),
                    "failure event carries the render error text"
                );
                assert_eq!(
                    events[3].status,
                    Some(500),
                    "completion event carries the delivered status"
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_cancel_drains_in_flight_handlers() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(8);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);

                let (release_tx, release_rx) = flume::unbounded::<()>();
                let renderer = RenderFn::rc("hold", move |_req: RenderRequest, _cfg: Value| {
                    let release = release_rx.clone();
                    async move {
                        let _ = release.recv_async().await;
                        Ok(Rendered::default().with_status(200))
                    }
                });

                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let gate = dispatcher.gate();
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let mut clients = Vec::new();
                for i in 0..2 {
                    let handle = handle.clone();
                    clients.push(tokio::task::spawn_local(async move {
                        handle.render(RenderRequest::get(format!("/slow/{i}"))).await
                    }));
                }

                settle().await;
                assert_eq!(gate.in_flight(), 2, "both requests admitted before cancel");

                token.cancel();
                settle().await;
                assert!(
                    !run.is_finished(),
                    "run waits for in-flight handlers after cancel"
                );

                release_tx.send(()).unwrap();
                release_tx.send(()).unwrap();
                for client in clients {
                    let response = client.await.unwrap().unwrap();
                    assert_eq!(response.status, 200, "admitted request delivered after cancel");
                }
                run.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_source_failure_is_fatal_after_drain() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, receiver) = channel(4);
                let host = Rc::new(ChannelHost::new(receiver, None));
                let bus = Bus::new(16);

                let (release_tx, release_rx) = flume::unbounded::<()>();
                let renderer = RenderFn::rc("hold", move |_req: RenderRequest, _cfg: Value| {
                    let release = release_rx.clone();
                    async move {
                        let _ = release.recv_async().await;
                        Ok(Rendered::default().with_status(200))
                    }
                });

                let dispatcher = Dispatcher::new(
                    &DispatchConfig::default(),
                    host.clone(),
                    host.clone(),
                    renderer,
                    bus,
                );
                let token = CancellationToken::new();
                let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

                let (resp_tx, resp_rx) = oneshot::channel();
                handle
                    .submit((RenderRequest::get("/hold"), resp_tx))
                    .await
                    .unwrap();
                drop(handle);

                settle().await;
                assert!(
                    !run.is_finished(),
                    "run drains the admitted request before failing"
                );

                release_tx.send(()).unwrap();
                let response = resp_rx.await.unwrap();
                assert_eq!(response.status, 200, "in-flight request delivered on the way out");

                let res = run.await.unwrap();
                assert!(
                    matches!(res, Err(HostError::SourceClosed)),
                    "closed source is reported: {res:?}"
                );
            })
            .await;
    }
}
