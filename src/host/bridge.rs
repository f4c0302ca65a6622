//! # Host bridge seams: intake and delivery.
//!
//! A dispatcher talks to its host environment exclusively through two
//! traits: [`RequestSource`] (configuration + serialized intake) and
//! [`ResponseSink`] (correlated delivery). [`Incoming`] pairs a request
//! with the [`RequestId`] its response must be delivered under.
//!
//! ## Rules
//! - The configuration is fetched **once**, before the first request.
//! - At most one `next_request()` call is outstanding at any time; the
//!   dispatch loop serializes intake.
//! - Every fetched request is answered exactly once via `send_response`
//!   under its id.
//! - Source errors are fatal to the dispatcher; sink errors are not.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DeliverError, HostError};
use crate::render::{RenderRequest, RenderResponse};

/// Opaque correlation token pairing a request with its response slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw id value.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One unit of intake: the request plus the id its response is keyed by.
#[derive(Debug)]
pub struct Incoming {
    /// Correlation id minted by the source.
    pub id: RequestId,
    /// The request to render.
    pub request: RenderRequest,
}

/// # Where requests come from.
///
/// Implementations suspend in [`next_request`](RequestSource::next_request)
/// until a request is available. An error from either method means the host
/// side is gone or broken; the dispatcher treats it as fatal, drains its
/// in-flight work and returns.
#[async_trait(?Send)]
pub trait RequestSource: 'static {
    /// Fetches the render-routine configuration blob.
    ///
    /// Called exactly once per dispatcher run, before the first request.
    /// `Ok(None)` means the host has no configuration; the dispatcher
    /// substitutes an empty JSON object.
    async fn configuration(&self) -> Result<Option<Value>, HostError>;

    /// Fetches the next request, suspending until one is available.
    async fn next_request(&self) -> Result<Incoming, HostError>;
}

/// # Where responses go.
///
/// Delivery is keyed by the [`RequestId`] from the matching [`Incoming`].
/// Errors are per-response (requester gone, id unknown) and never tear the
/// dispatcher down.
#[async_trait(?Send)]
pub trait ResponseSink: 'static {
    /// Delivers the response for `id` to the host.
    async fn send_response(
        &self,
        id: RequestId,
        response: RenderResponse,
    ) -> Result<(), DeliverError>;
}
