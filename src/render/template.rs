//! # Index-page assembly from response fields.
//!
//! [`PageTemplate`] substitutes `<!--ssr-{key}-->` markers in an index page
//! with the matching values from a response field map, in a single pass.
//!
//! ## Rules
//! - Every marker whose key appears in the field map is replaced, at every
//!   occurrence.
//! - Markers without a matching key stay in the page untouched.
//! - An empty field map returns the page unchanged.

use std::collections::HashMap;

use aho_corasick::AhoCorasick;

/// Index page with `<!--ssr-{key}-->` substitution markers.
///
/// Construct once at startup, call [`apply`](PageTemplate::apply) per
/// response. Substitution runs in one pass over the page regardless of how
/// many fields are set.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    index: String,
}

impl PageTemplate {
    /// Wraps an index page.
    pub fn new(index_html: impl Into<String>) -> Self {
        Self {
            index: index_html.into(),
        }
    }

    /// Replaces every `<!--ssr-{key}-->` marker with the field's value.
    ///
    /// ## Panics
    /// Panics if the automaton over the field keys exceeds the aho-corasick
    /// size limits (unreachable for realistic field maps).
    pub fn apply(&self, fields: &HashMap<String, String>) -> String {
        if fields.is_empty() {
            return self.index.clone();
        }

        let (patterns, values): (Vec<String>, Vec<&String>) = fields
            .iter()
            .map(|(k, v)| (format!("<!--ssr-{k}-->"), v))
            .unzip();

        let ac = AhoCorasick::new(&patterns).expect("aho corasick limit exceeded");

        ac.replace_all(&self.index, &values)
    }
}
