//! # Render request model.
//!
//! [`RenderRequest`] is the host-facing description of one page request.
//! The dispatch core treats it as opaque cargo: it is fetched from the
//! source, handed to the render routine, and never inspected in between.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One page request, as handed to a render routine.
///
/// Serializable so hosts can move it across process or embedding boundaries
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Peer address of the original requester.
    pub address: String,
    /// Upper-cased HTTP method (`"GET"`, `"POST"`, ...).
    pub method: String,
    /// Path plus query string (`"/app?tab=1"`).
    pub uri: String,
    /// Header map, one value per name.
    pub headers: HashMap<String, String>,
    /// Raw request body.
    pub body: String,
}

impl RenderRequest {
    /// Builds a minimal GET request for the given uri.
    ///
    /// Address, headers and body are left empty. Useful for demos and tests;
    /// real hosts fill every field from the incoming connection.
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            address: String::new(),
            method: "GET".to_string(),
            uri: uri.into(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }
}
