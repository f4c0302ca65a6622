//! # Render output and its normalized form.
//!
//! A render routine produces a [`Rendered`] value where both the status and
//! the field map may be omitted. The dispatch core never patches values
//! after the fact: the conversion into [`RenderResponse`] applies the
//! defaults exactly once, at construction.
//!
//! ## Rules
//! - Missing status → [`DEFAULT_STATUS`] (404).
//! - Missing fields → empty map.
//! - Present values pass through untouched.
//! - A failed or panicked render is substituted by
//!   [`RenderResponse::failure`]: status 500, `head` empty, `body` carrying
//!   the failure text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Status used when a render routine reports none.
pub const DEFAULT_STATUS: u16 = 404;

/// Raw output of a render routine, both parts omissible.
///
/// Routines that cannot resolve a route return `Rendered::default()`;
/// the conversion to [`RenderResponse`] turns that into a 404 with no
/// fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rendered {
    /// Response status; `None` means "route not handled".
    #[serde(default)]
    pub status: Option<u16>,
    /// Page fields keyed by marker name; `None` means no substitutions.
    #[serde(default)]
    pub fields: Option<HashMap<String, String>>,
}

impl Rendered {
    /// Sets the response status.
    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Inserts one page field, creating the map on first use.
    #[inline]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Normalized response delivered back to the host.
///
/// Produced from [`Rendered`] via `From` (defaults applied) or from a
/// failure via [`RenderResponse::failure`]. Every admitted request yields
/// exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    /// Response status code.
    pub status: u16,
    /// Page fields keyed by marker name (see `PageTemplate`).
    pub fields: HashMap<String, String>,
}

impl RenderResponse {
    /// Builds the substitute response for a failed or panicked render.
    ///
    /// Status 500 with two fields: an empty `head` and a `body` carrying
    /// the failure's textual description verbatim.
    pub fn failure(text: impl Into<String>) -> Self {
        let mut fields = HashMap::with_capacity(2);
        fields.insert("head".to_string(), String::new());
        fields.insert("body".to_string(), text.into());
        Self {
            status: 500,
            fields,
        }
    }
}

impl From<Rendered> for RenderResponse {
    /// Applies the defaults: missing status → [`DEFAULT_STATUS`], missing
    /// fields → empty map.
    fn from(rendered: Rendered) -> Self {
        Self {
            status: rendered.status.unwrap_or(DEFAULT_STATUS),
            fields: rendered.fields.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parts_default_at_construction() {
        let resp = RenderResponse::from(Rendered::default());
        assert_eq!(resp.status, DEFAULT_STATUS);
        assert!(resp.fields.is_empty(), "defaulted fields must be empty");
    }

    #[test]
    fn test_present_parts_pass_through_untouched() {
        let rendered = Rendered::default().with_status(201).with_field("a", "b");
        let resp = RenderResponse::from(rendered);
        assert_eq!(resp.status, 201);
        assert_eq!(resp.fields.len(), 1);
        assert_eq!(resp.fields.get("a").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_missing_status_keeps_present_fields() {
        let rendered = Rendered::default().with_field("head", "<title>x</title>");
        let resp = RenderResponse::from(rendered);
        assert_eq!(resp.status, DEFAULT_STATUS);
        assert_eq!(resp.fields.len(), 1);
    }

    #[test]
    fn test_failure_substitute_shape() {
        let resp = RenderResponse::failure("boom");
        assert_eq!(resp.status, 500);
        assert_eq!(resp.fields.len(), 2);
        assert_eq!(resp.fields.get("head").map(String::as_str), Some(""));
        assert_eq!(resp.fields.get("body").map(String::as_str), Some("boom"));
    }

    #[test]
    fn test_empty_object_deserializes_to_all_defaults() {
        let rendered: Rendered = serde_json::from_str("{}").unwrap();
        assert!(rendered.status.is_none());
        assert!(rendered.fields.is_none());
    }
}
