//! # Render model: requests, outputs and the render seam.
//!
//! This module provides the render-side types:
//! - [`RenderRequest`] - one page request, opaque to the dispatch core
//! - [`Rendered`] - raw routine output with omissible parts
//! - [`RenderResponse`] - normalized response (defaults applied at construction)
//! - [`Render`] - trait for implementing async render routines
//! - [`RenderFn`] - function-based routine implementation
//! - [`RenderRef`] - shared reference to a routine (`Rc<dyn Render>`)
//! - [`PageTemplate`] - `<!--ssr-{key}-->` marker substitution into an index page

mod renderer;
mod request;
mod response;
mod template;

pub use renderer::{Render, RenderFn, RenderRef};
pub use request::RenderRequest;
pub use response::{RenderResponse, Rendered, DEFAULT_STATUS};
pub use template::PageTemplate;
