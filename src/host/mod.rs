//! # Host bridge: how requests reach a dispatcher and responses leave it.
//!
//! This module provides the host-facing types:
//! - [`RequestSource`] / [`ResponseSink`] - the two seams a dispatcher talks through
//! - [`Incoming`] - one fetched request with its correlation id
//! - [`RequestId`] - opaque correlation token
//! - [`channel`] / [`RenderHandle`] / [`RequestReceiver`] - bounded MPMC plumbing
//! - [`ChannelHost`] - channel-backed implementation of both seams

mod bridge;
mod channel;

pub use bridge::{Incoming, RequestId, RequestSource, ResponseSink};
pub use channel::{channel, ChannelHost, RenderHandle, RequestReceiver};

pub(crate) use channel::Submission;
