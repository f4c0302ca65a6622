//! # Worker thread: one dispatcher per OS thread.
//!
//! A worker owns a current-thread tokio runtime with a `LocalSet`, builds
//! its renderer on the spot via the pool's factory (renderers may be
//! `!Send`, so they never cross threads), wires a [`ChannelHost`] to the
//! shared request queue, and drives a [`Dispatcher`] until its token is
//! cancelled or the queue closes.

use std::rc::Rc;
use std::thread;

use serde_json::Value;
use tokio::runtime;
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;

use crate::core::{DispatchConfig, Dispatcher};
use crate::events::{Bus, Event, EventKind};
use crate::host::{ChannelHost, RequestReceiver};
use crate::pool::RendererFactory;
use crate::render::RenderRef;

/// Handle to one spawned worker thread.
///
/// Retirement is cooperative: [`WorkerHandle::retire`] cancels the worker's
/// token, its dispatcher stops intake and drains in-flight renders, then
/// the thread exits and [`WorkerHandle::is_finished`] flips.
pub(crate) struct WorkerHandle {
    thread: thread::JoinHandle<()>,
    token: CancellationToken,
}

impl WorkerHandle {
    /// Spawns a worker thread and returns its handle.
    ///
    /// Publishes `WorkerStarted` once the runtime is up and `WorkerStopped`
    /// (with an exit reason) when the thread winds down. A runtime build
    /// failure is reported the same way; the pool reaps the dead handle on
    /// its next pass.
    pub(crate) fn spawn(
        id: usize,
        receiver: RequestReceiver,
        factory: RendererFactory,
        configuration: Option<Value>,
        dispatch: DispatchConfig,
        bus: Bus,
    ) -> Self {
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let thread = thread::spawn(move || {
            let rt = match runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    bus.publish(
                        Event::new(EventKind::WorkerStopped)
                            .with_worker(id)
                            .with_reason(format!("runtime build failed: {err}")),
                    );
                    return;
                }
            };

            bus.publish(Event::new(EventKind::WorkerStarted).with_worker(id));

            let reason = rt.block_on(async {
                let local = LocalSet::new();
                local
                    .run_until(async {
                        let renderer: RenderRef = Rc::from(factory());
                        let host = Rc::new(ChannelHost::new(receiver, configuration));
                        let dispatcher = Dispatcher::new(
                            &dispatch,
                            host.clone(),
                            host.clone(),
                            renderer,
                            bus.clone(),
                        );
                        match dispatcher.run(worker_token).await {
                            Ok(()) => "retired".to_string(),
                            Err(err) => err.to_string(),
                        }
                    })
                    .await
            });

            bus.publish(
                Event::new(EventKind::WorkerStopped)
                    .with_worker(id)
                    .with_reason(reason),
            );
        });

        Self { thread, token }
    }

    /// Asks the worker to stop after draining its in-flight renders.
    pub(crate) fn retire(&self) {
        self.token.cancel();
    }

    /// True once retirement has been requested.
    pub(crate) fn is_retiring(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the worker thread has exited.
    pub(crate) fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}
