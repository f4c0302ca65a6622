//! # Channel-backed host bridge.
//!
//! Connects request submitters to dispatcher workers over a bounded MPMC
//! queue, one oneshot response channel per request.
//!
//! ## Architecture
//! ```text
//! RenderHandle (Clone, Send)          RequestReceiver (Clone, Send)
//!   render(req) ──► [flume bounded] ──► ChannelHost (one per dispatcher)
//!       │             (req, tx)            │ next_request(): recv + mint id
//!       │                                  │                 park tx in pending map
//!       ▼                                  ▼
//!   rx.await ◄──────── oneshot ◄──────── send_response(id): take tx, send
//! ```
//!
//! ## Rules
//! - The queue is MPMC: cloning [`RequestReceiver`] shares it between
//!   workers (whoever fetches first gets the request).
//! - Ids are minted by the consuming [`ChannelHost`] **after** the fetch
//!   resolves, so abandoned fetches never burn an id.
//! - The pending map holds each response sender until delivery; removal on
//!   delivery is what makes a duplicate send detectable.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{DeliverError, HostError, SubmitError};
use crate::host::bridge::{Incoming, RequestId, RequestSource, ResponseSink};
use crate::render::{RenderRequest, RenderResponse};

/// One queued unit of work: the request plus its response channel.
pub(crate) type Submission = (RenderRequest, oneshot::Sender<RenderResponse>);

/// Creates a bounded render channel.
///
/// Returns the submitter side ([`RenderHandle`]) and the worker side
/// ([`RequestReceiver`]). Capacity is clamped to a minimum of 1. When the
/// queue is full, submitters wait; the queue length is the scale-up signal
/// for the worker pool.
pub fn channel(capacity: usize) -> (RenderHandle, RequestReceiver) {
    let (tx, rx) = flume::bounded::<Submission>(capacity.max(1));
    (RenderHandle { tx }, RequestReceiver { rx })
}

/// Submitter-side handle: send a request, await its response.
///
/// Cheap to clone; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    tx: flume::Sender<Submission>,
}

impl RenderHandle {
    /// Submits a request and waits for its response.
    ///
    /// - [`SubmitError::Closed`]: every receiver is gone, nothing will ever
    ///   pick the request up.
    /// - [`SubmitError::Lost`]: a worker fetched the request but died
    ///   before responding.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderResponse, SubmitError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send_async((request, tx))
            .await
            .map_err(|_| SubmitError::Closed)?;
        rx.await.map_err(|_| SubmitError::Lost)
    }

    /// Forwards a pre-built submission, keeping its response channel.
    pub(crate) async fn submit(&self, submission: Submission) -> Result<(), SubmitError> {
        self.tx
            .send_async(submission)
            .await
            .map_err(|_| SubmitError::Closed)
    }

    pub(crate) fn queue_is_full(&self) -> bool {
        self.tx.is_full()
    }

    pub(crate) fn queue_is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Worker-side intake end of the render channel.
///
/// Cloning shares the queue: each submission is fetched by exactly one
/// clone. Hand one clone to each dispatcher via [`ChannelHost`].
#[derive(Debug, Clone)]
pub struct RequestReceiver {
    rx: flume::Receiver<Submission>,
}

impl RequestReceiver {
    pub(crate) async fn recv(&self) -> Result<Submission, flume::RecvError> {
        self.rx.recv_async().await
    }

    /// Number of submissions waiting in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if no submission is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Host bridge for one dispatcher over a [`RequestReceiver`].
///
/// Implements both [`RequestSource`] and [`ResponseSink`]: mints wrapping
/// `u64` correlation ids, parks each response sender in a pending map on
/// fetch and takes it back out on delivery.
///
/// Single-threaded by design (`Cell`/`RefCell`); share it within one
/// dispatcher via `Rc`.
pub struct ChannelHost {
    receiver: RequestReceiver,
    config: Option<Value>,
    next_id: Cell<u64>,
    pending: RefCell<HashMap<RequestId, oneshot::Sender<RenderResponse>>>,
}

impl ChannelHost {
    /// Wraps a receiver, with an optional configuration blob for the
    /// render routine.
    pub fn new(receiver: RequestReceiver, config: Option<Value>) -> Self {
        Self {
            receiver,
            config,
            next_id: Cell::new(0),
            pending: RefCell::new(HashMap::new()),
        }
    }

    fn mint_id(&self) -> RequestId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        RequestId::new(id)
    }

    /// Number of fetched requests still awaiting delivery.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

#[async_trait(?Send)]
impl RequestSource for ChannelHost {
    async fn configuration(&self) -> Result<Option<Value>, HostError> {
        Ok(self.config.clone())
    }

    async fn next_request(&self) -> Result<Incoming, HostError> {
        let (request, tx) = self
            .receiver
            .recv()
            .await
            .map_err(|_| HostError::SourceClosed)?;

        // No await between the fetch resolving and the insert: the sender
        // is parked before anyone can deliver against the new id.
        let id = self.mint_id();
        self.pending.borrow_mut().insert(id, tx);

        Ok(Incoming { id, request })
    }
}

#[async_trait(?Send)]
impl ResponseSink for ChannelHost {
    async fn send_response(
        &self,
        id: RequestId,
        response: RenderResponse,
    ) -> Result<(), DeliverError> {
        let tx = self
            .pending
            .borrow_mut()
            .remove(&id)
            .ok_or(DeliverError::Unknown { id })?;

        tx.send(response).map_err(|_| DeliverError::Abandoned { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Rendered;

    #[tokio::test]
    async fn test_round_trip_through_channel_host() {
        let (handle, receiver) = channel(4);
        let host = ChannelHost::new(receiver, None);

        let client = tokio::spawn({
            let handle = handle.clone();
            async move { handle.render(RenderRequest::get("/a")).await }
        });

        let incoming = host.next_request().await.unwrap();
        assert_eq!(incoming.request.uri, "/a");
        assert_eq!(host.pending(), 1);

        let resp = RenderResponse::from(Rendered::default().with_status(200));
        host.send_response(incoming.id, resp).await.unwrap();
        assert_eq!(host.pending(), 0);

        let got = client.await.unwrap().unwrap();
        assert_eq!(got.status, 200);
    }

    #[tokio::test]
    async fn test_ids_are_distinct_across_fetches() {
        let (handle, receiver) = channel(4);
        let host = ChannelHost::new(receiver, None);

        let mut clients = Vec::new();
        for i in 0..3 {
            let handle = handle.clone();
            clients.push(tokio::spawn(async move {
                handle.render(RenderRequest::get(format!("/{i}"))).await
            }));
        }

        let a = host.next_request().await.unwrap();
        let b = host.next_request().await.unwrap();
        let c = host.next_request().await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);

        for incoming in [a, b, c] {
            host.send_response(incoming.id, RenderResponse::failure("done"))
                .await
                .unwrap();
        }
        for client in clients {
            assert!(client.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_second_delivery_for_same_id_is_unknown() {
        let (handle, receiver) = channel(4);
        let host = ChannelHost::new(receiver, None);

        let client = tokio::spawn({
            let handle = handle.clone();
            async move { handle.render(RenderRequest::get("/x")).await }
        });

        let incoming = host.next_request().await.unwrap();
        host.send_response(incoming.id, RenderResponse::failure("first"))
            .await
            .unwrap();

        let again = host
            .send_response(incoming.id, RenderResponse::failure("second"))
            .await;
        assert_eq!(again, Err(DeliverError::Unknown { id: incoming.id }));
        let _ = client.await.unwrap();
    }

    #[tokio::test]
    async fn test_never_fetched_id_is_unknown() {
        let (_handle, receiver) = channel(1);
        let host = ChannelHost::new(receiver, None);

        let bogus = RequestId::new(999);
        let res = host.send_response(bogus, RenderResponse::failure("x")).await;
        assert_eq!(res, Err(DeliverError::Unknown { id: bogus }));
    }

    #[tokio::test]
    async fn test_dropped_requester_is_abandoned() {
        let (handle, receiver) = channel(4);
        let host = ChannelHost::new(receiver, None);

        let (tx, rx) = oneshot::channel();
        drop(rx);
        handle
            .submit((RenderRequest::get("/gone"), tx))
            .await
            .unwrap();

        let incoming = host.next_request().await.unwrap();
        let res = host
            .send_response(incoming.id, RenderResponse::failure("late"))
            .await;
        assert_eq!(res, Err(DeliverError::Abandoned { id: incoming.id }));
    }

    #[tokio::test]
    async fn test_render_is_closed_once_receivers_are_gone() {
        let (handle, receiver) = channel(1);
        drop(receiver);

        let res = handle.render(RenderRequest::get("/x")).await;
        assert_eq!(res, Err(SubmitError::Closed));
    }

    #[tokio::test]
    async fn test_render_is_lost_when_worker_drops_the_sender() {
        let (handle, receiver) = channel(1);

        let client = tokio::spawn(async move { handle.render(RenderRequest::get("/x")).await });

        let (_request, tx) = receiver.recv().await.unwrap();
        drop(tx);

        let res = client.await.unwrap();
        assert_eq!(res, Err(SubmitError::Lost));
    }

    #[tokio::test]
    async fn test_next_request_fails_once_handles_are_gone() {
        let (handle, receiver) = channel(1);
        let host = ChannelHost::new(receiver, None);
        drop(handle);

        let res = host.next_request().await;
        assert!(matches!(res, Err(HostError::SourceClosed)));
    }

    #[tokio::test]
    async fn test_configuration_blob_passthrough() {
        let (_handle, receiver) = channel(1);
        let host = ChannelHost::new(receiver, Some(serde_json::json!({"k": "v"})));
        let cfg = host.configuration().await.unwrap();
        assert_eq!(cfg, Some(serde_json::json!({"k": "v"})));

        let (_handle, receiver) = channel(1);
        let host = ChannelHost::new(receiver, None);
        assert_eq!(host.configuration().await.unwrap(), None);
    }
}
