//! Error types used by the rendervisor runtime and hosts.
//!
//! This module defines the error enums for each failure class:
//!
//! - [`RenderError`] — errors raised by a single render call (contained).
//! - [`HostError`] — errors raised by the host bridge itself (fatal to a dispatcher).
//! - [`DeliverError`] — errors delivering one response (non-fatal).
//! - [`SubmitError`] — errors submitting a request to a dispatcher or pool.
//!
//! All types provide an `as_label()` helper returning a short stable
//! snake_case label for logs/metrics.

use thiserror::Error;

use crate::host::RequestId;

/// # Errors produced by a render call.
///
/// These are contained per request: the handler converts them into a
/// status-500 substitute response and the dispatch loop keeps running.
///
/// The `Display` form of [`RenderError::Failed`] is the bare error text,
/// because the substitute response carries it verbatim in its `body` field.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RenderError {
    /// Render routine returned an error.
    #[error("{error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Render routine panicked; the panic was caught at the handler boundary.
    #[error("render panicked: {info}")]
    Panicked {
        /// Panic payload, downcast to text when possible.
        info: String,
    },
}

impl RenderError {
    /// Creates a [`RenderError::Failed`] from any message.
    ///
    /// # Example
    /// ```
    /// use rendervisor::RenderError;
    ///
    /// let err = RenderError::failed("boom");
    /// assert_eq!(err.to_string(), "boom");
    /// ```
    pub fn failed(error: impl Into<String>) -> Self {
        RenderError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rendervisor::RenderError;
    ///
    /// let err = RenderError::failed("boom");
    /// assert_eq!(err.as_label(), "render_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RenderError::Failed { .. } => "render_failed",
            RenderError::Panicked { .. } => "render_panicked",
        }
    }
}

/// # Errors produced by the host bridge.
///
/// These represent infrastructure failures: the configuration fetch or the
/// request intake itself broke. They are not recovered; the dispatcher
/// stops intake, drains in-flight work, and returns the error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// The request source is gone; no further request can ever arrive.
    #[error("request source closed")]
    SourceClosed,

    /// The configuration fetch failed before the loop started.
    #[error("configuration fetch failed: {error}")]
    Config {
        /// The underlying error message.
        error: String,
    },
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rendervisor::HostError;
    ///
    /// assert_eq!(HostError::SourceClosed.as_label(), "host_source_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::SourceClosed => "host_source_closed",
            HostError::Config { .. } => "host_config",
        }
    }
}

/// # Errors delivering a single response.
///
/// Delivery failures are per-request and never fatal: the handler publishes
/// a `ResponseAbandoned` event and releases its admission slot as usual.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverError {
    /// No response slot is pending for this id (already delivered, or never fetched).
    #[error("no pending response for request {id}")]
    Unknown {
        /// Correlation id the delivery was keyed by.
        id: RequestId,
    },

    /// The requester stopped waiting before the response arrived.
    #[error("requester for {id} is gone")]
    Abandoned {
        /// Correlation id the delivery was keyed by.
        id: RequestId,
    },
}

impl DeliverError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliverError::Unknown { .. } => "deliver_unknown_id",
            DeliverError::Abandoned { .. } => "deliver_abandoned",
        }
    }
}

/// Error returned when submitting a request to a dispatcher or pool.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The render queue is closed (no dispatcher will ever pick the request up).
    #[error("render queue closed")]
    Closed,

    /// A dispatcher picked the request up but died before responding.
    #[error("render worker dropped the request")]
    Lost,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::Closed => "submit_closed",
            SubmitError::Lost => "submit_lost",
        }
    }
}
