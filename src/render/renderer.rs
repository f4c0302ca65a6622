//! # Render seam and function-backed render routine.
//!
//! This module defines the [`Render`] trait (async, worker-local) and a
//! convenient function-backed implementation [`RenderFn`]. The common handle
//! type is [`RenderRef`], an `Rc<dyn Render>` shared within one dispatcher
//! thread.
//!
//! Renderers are deliberately **not** required to be `Send`: a routine may
//! own a thread-local engine (a script runtime, an arena, an FFI handle)
//! that must never cross threads. The pool runs one renderer per worker
//! thread for exactly this reason.

use std::borrow::Cow;
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RenderError;
use crate::render::request::RenderRequest;
use crate::render::response::Rendered;

/// Shared handle to a render routine (`Rc<dyn Render>`).
pub type RenderRef = Rc<dyn Render>;

/// # Asynchronous render routine.
///
/// A `Render` has a stable [`name`](Render::name) and an async
/// [`render`](Render::render) method that receives the request and the
/// host configuration blob. Errors and panics are contained by the caller;
/// a routine never takes its dispatcher down.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use rendervisor::{Render, RenderError, RenderRequest, Rendered};
///
/// struct Demo;
///
/// #[async_trait(?Send)]
/// impl Render for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn render(
///         &self,
///         request: &RenderRequest,
///         _config: &Value,
///     ) -> Result<Rendered, RenderError> {
///         Ok(Rendered::default()
///             .with_status(200)
///             .with_field("body", format!("you asked for {}", request.uri)))
///     }
/// }
/// ```
#[async_trait(?Send)]
pub trait Render: 'static {
    /// Returns a stable, human-readable routine name.
    fn name(&self) -> &str;

    /// Produces the raw render output for one request.
    ///
    /// `config` is the host configuration blob, fetched once per dispatcher
    /// run and shared read-only across all calls.
    async fn render(
        &self,
        request: &RenderRequest,
        config: &Value,
    ) -> Result<Rendered, RenderError>;
}

/// Function-backed render routine.
///
/// Wraps a closure that *creates* a new future per call. The closure
/// receives owned clones of the request and configuration so it can move
/// them into its future freely.
#[derive(Debug)]
pub struct RenderFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> RenderFn<F> {
    /// Creates a new function-backed routine.
    ///
    /// Prefer [`RenderFn::rc`] when you immediately need a [`RenderRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the routine and returns it as a shared handle (`Rc<dyn Render>`).
    ///
    /// ## Example
    /// ```rust
    /// use serde_json::Value;
    /// use rendervisor::{RenderError, RenderFn, RenderRef, RenderRequest, Rendered};
    ///
    /// let r: RenderRef = RenderFn::rc("hello", |_req: RenderRequest, _cfg: Value| async {
    ///     Ok::<_, RenderError>(Rendered::default().with_status(200))
    /// });
    /// assert_eq!(r.name(), "hello");
    /// ```
    pub fn rc(name: impl Into<Cow<'static, str>>, f: F) -> Rc<Self> {
        Rc::new(Self::new(name, f))
    }
}

#[async_trait(?Send)]
impl<F, Fut> Render for RenderFn<F>
where
    F: Fn(RenderRequest, Value) -> Fut + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<Rendered, RenderError>> + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn render(
        &self,
        request: &RenderRequest,
        config: &Value,
    ) -> Result<Rendered, RenderError> {
        (self.f)(request.clone(), config.clone()).await
    }
}
