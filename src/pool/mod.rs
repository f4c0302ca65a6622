//! # Render pool: elastic dispatcher workers over a shared queue.
//!
//! [`RenderPool`] is a cloneable handle that fans render requests out to a
//! pool of worker threads, each running its own current-thread runtime and
//! [`Dispatcher`](crate::core::Dispatcher). Workers pull from one shared
//! bounded queue, so a busy worker never strands requests behind it.
//!
//! ```text
//!  RenderPool ──mpsc──► supervise ──flume──► worker ─┐
//!   (clone)                │                 worker ─┼─► renderer
//!   (clone)                │ scale / gc      worker ─┘
//!                          ▼
//!                    WorkerHandle(s)
//! ```
//!
//! ## Rules
//! - Renderers are built **on** the worker thread by the factory; they
//!   never cross a thread boundary and may be `!Send`.
//! - Scale up when the pool is empty, or when the shared queue is full and
//!   head-room remains under `max_workers`.
//! - A `gc_interval` tick retires one worker at a time while the queue is
//!   idle; the last worker is never retired.
//! - The pool owns the event bus all of its workers publish into, sized by
//!   `bus_capacity`; subscribe through [`RenderPool::bus`].
//! - [`RenderPool::shutdown`] retires every worker and bounds the wait by
//!   `grace`; in-flight renders complete, queued-but-unclaimed requests
//!   are reported to their submitters as [`SubmitError::Lost`].

mod worker;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::DispatchConfig;
use crate::error::SubmitError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{channel, Submission};
use crate::render::{Render, RenderRequest, RenderResponse};

use worker::WorkerHandle;

/// Builds a fresh renderer on a worker thread.
///
/// Invoked once per spawned worker, inside that worker's thread, so the
/// returned renderer never has to be `Send`.
pub type RendererFactory = Arc<dyn Fn() -> Box<dyn Render> + Send + Sync>;

/// Pool sizing and lifecycle knobs.
///
/// ## Defaults
/// - `max_workers`: available parallelism (at least 1)
/// - `queue_capacity`: `max_workers`
/// - `bus_capacity`: 1024
/// - `gc_interval`: 60s
/// - `grace`: 60s
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on concurrently running worker threads.
    pub max_workers: usize,

    /// Capacity of the shared request queue workers pull from.
    ///
    /// A full queue is the backlog signal that triggers scale-up.
    pub queue_capacity: usize,

    /// Capacity of the pool's event bus ring buffer.
    ///
    /// Every worker publishes into this one ring; a subscriber that falls
    /// more than this many events behind observes `Lagged` and skips the
    /// overwritten ones. Minimum 1 (clamped by `Bus`).
    pub bus_capacity: usize,

    /// How often the pool looks for an idle worker to retire.
    pub gc_interval: Duration,

    /// How long [`RenderPool::shutdown`] waits for workers to drain
    /// before reporting `GraceExceeded`.
    pub grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            max_workers: workers,
            queue_capacity: workers,
            bus_capacity: 1024,
            gc_interval: Duration::from_secs(60),
            grace: Duration::from_secs(60),
        }
    }
}

/// Cloneable handle to a running render pool.
///
/// Submitting through any clone reaches the same workers. Dropping every
/// clone closes intake and winds the pool down, as does an explicit
/// [`RenderPool::shutdown`].
#[derive(Clone)]
pub struct RenderPool {
    tx: mpsc::Sender<Submission>,
    token: CancellationToken,
    bus: Bus,
}

impl RenderPool {
    /// Starts the pool supervisor and returns a handle to it.
    ///
    /// Workers are spawned lazily: the first submission brings the first
    /// worker up, backlog brings more (up to `max_workers`). The
    /// `configuration` blob is handed to every worker's host unchanged.
    /// The pool builds its own event bus with `config.bus_capacity` slots;
    /// reach it through [`RenderPool::bus`].
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime (the supervisor is a
    /// spawned task).
    pub fn new(
        config: PoolConfig,
        dispatch: DispatchConfig,
        configuration: Option<Value>,
        factory: RendererFactory,
    ) -> Self {
        let bus = Bus::new(config.bus_capacity);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let token = CancellationToken::new();

        tokio::spawn(supervise(
            rx,
            config,
            dispatch,
            configuration,
            factory,
            bus.clone(),
            token.clone(),
        ));

        Self { tx, token, bus }
    }

    /// The bus every worker of this pool publishes into.
    ///
    /// Subscribe here (directly or via a
    /// [`SubscriberSet`](crate::SubscriberSet) listener) to observe worker
    /// lifecycle and per-request events.
    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Renders one request on some worker and returns its response.
    ///
    /// `Closed` means the pool is no longer accepting work; `Lost` means
    /// the request was accepted but its worker went away before a response
    /// was produced.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderResponse, SubmitError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send((request, tx))
            .await
            .map_err(|_| SubmitError::Closed)?;
        rx.await.map_err(|_| SubmitError::Lost)
    }

    /// Requests pool shutdown: retire every worker, wait up to `grace`.
    ///
    /// Returns immediately; progress is observable through the event bus
    /// (`ShutdownRequested`, then `AllWorkersStopped` or `GraceExceeded`).
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

/// Supervisor task: forwards submissions, scales, retires, shuts down.
async fn supervise(
    mut rx: mpsc::Receiver<Submission>,
    config: PoolConfig,
    dispatch: DispatchConfig,
    configuration: Option<Value>,
    factory: RendererFactory,
    bus: Bus,
    token: CancellationToken,
) {
    let (forward, receiver) = channel(config.queue_capacity);
    let mut workers = Workers::new(config.max_workers);
    let mut next_id = 0usize;
    let mut gc = time::interval(config.gc_interval);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            submission = rx.recv() => {
                let Some(submission) = submission else { break };

                workers.reap();
                if workers.is_empty() || (forward.queue_is_full() && workers.has_capacity()) {
                    let id = next_id;
                    next_id += 1;
                    workers.push(WorkerHandle::spawn(
                        id,
                        receiver.clone(),
                        Arc::clone(&factory),
                        configuration.clone(),
                        dispatch.clone(),
                        bus.clone(),
                    ));
                }

                if forward.submit(submission).await.is_err() {
                    break;
                }
            }
            _ = gc.tick() => {
                workers.reap();
                if forward.queue_is_empty() {
                    workers.retire_one();
                }
            }
        }
    }

    shutdown_workers(&workers, &bus, config.grace).await;
}

/// Retires every worker and waits for their threads, bounded by `grace`.
async fn shutdown_workers(workers: &Workers, bus: &Bus, grace: Duration) {
    bus.publish(Event::new(EventKind::ShutdownRequested));
    workers.retire_all();

    let drained = async {
        while !workers.all_finished() {
            time::sleep(Duration::from_millis(25)).await;
        }
    };

    match time::timeout(grace, drained).await {
        Ok(()) => bus.publish(Event::new(EventKind::AllWorkersStopped)),
        Err(_) => {
            let stuck = workers.stuck();
            bus.publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.to_string()));
        }
    }
}

/// Live worker bookkeeping for the supervisor.
struct Workers {
    handles: Vec<WorkerHandle>,
    max: usize,
}

impl Workers {
    fn new(max: usize) -> Self {
        Self {
            handles: Vec::new(),
            max,
        }
    }

    fn push(&mut self, worker: WorkerHandle) {
        self.handles.push(worker);
    }

    fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn has_capacity(&self) -> bool {
        self.handles.len() < self.max
    }

    /// Drops handles whose threads have already exited.
    fn reap(&mut self) {
        let mut finished = Vec::new();
        for (idx, worker) in self.handles.iter().enumerate() {
            if worker.is_finished() {
                finished.push(idx);
            }
        }
        for idx in finished.iter().rev() {
            self.handles.swap_remove(*idx);
        }
    }

    /// Retires the most recently spawned worker.
    ///
    /// Skipped while only one worker remains or a retirement is already in
    /// progress; the retired handle stays listed until its thread exits
    /// and `reap` collects it.
    fn retire_one(&mut self) {
        if self.handles.len() <= 1 {
            return;
        }
        if self.handles.iter().any(WorkerHandle::is_retiring) {
            return;
        }
        if let Some(worker) = self.handles.last() {
            worker.retire();
        }
    }

    fn retire_all(&self) {
        for worker in &self.handles {
            worker.retire();
        }
    }

    fn all_finished(&self) -> bool {
        self.handles.iter().all(WorkerHandle::is_finished)
    }

    fn stuck(&self) -> usize {
        self.handles.iter().filter(|w| !w.is_finished()).count()
    }
}
