//! # Core: admission gate and dispatch loop.
//!
//! The pieces here turn a stream of host requests into bounded, isolated
//! render work. How they hang together:
//!
//! ```text
//!  host side                        render side
//!  ─────────                        ───────────
//!  RenderHandle ──► queue ──► RequestSource ──► Dispatcher ──► handlers
//!       ▲                                          │              │
//!       │                                    AdmissionGate        │
//!       │                                    (ready/up/down)      │
//!       └────────────── ResponseSink ◄────────────────────────────┘
//!
//!  every stage publishes to the Bus; subscribers watch from the side
//! ```
//!
//! Internal modules:
//! - [`gate`]: counts in-flight requests against a fixed ceiling and parks
//!   intake while the ceiling is reached;
//! - [`dispatcher`]: the single-threaded loop; serial intake, one spawned
//!   handler per admitted request;
//! - [`handler`]: per-request unit of work with failure isolation;
//! - [`config`]: tuning knobs with documented defaults.

mod config;
mod dispatcher;
mod gate;
mod handler;

pub use config::{DispatchConfig, DEFAULT_MAX_INFLIGHT};
pub use dispatcher::Dispatcher;
pub use gate::AdmissionGate;
