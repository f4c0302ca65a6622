//! # Dispatcher configuration.
//!
//! Provides [`DispatchConfig`] centralized settings for one dispatcher.
//!
//! Config is used in two ways:
//! 1. **Dispatcher creation**: `Dispatcher::new(&config, ...)`
//! 2. **Pool workers**: every worker builds its dispatcher from the same config
//!
//! ## Sentinel values
//! - `max_inflight = 0` → clamped to 1 by the gate (a dispatcher always
//!   admits at least one request)

/// Default in-flight ceiling per dispatcher.
pub const DEFAULT_MAX_INFLIGHT: usize = 1000;

/// Configuration for one dispatcher.
///
/// A dispatcher publishes to a caller-supplied [`Bus`](crate::Bus) and never
/// constructs one, so event-ring sizing lives with whoever owns the bus;
/// for pooled workers that is the pool's `bus_capacity` knob.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Maximum number of requests rendered concurrently by one dispatcher.
    ///
    /// When the ceiling is reached, intake pauses until a completion frees
    /// capacity. Clamped to a minimum of 1 by the gate.
    pub max_inflight: usize,
}

impl Default for DispatchConfig {
    /// Default configuration:
    ///
    /// - `max_inflight = 1000` ([`DEFAULT_MAX_INFLIGHT`])
    fn default() -> Self {
        Self {
            max_inflight: DEFAULT_MAX_INFLIGHT,
        }
    }
}
