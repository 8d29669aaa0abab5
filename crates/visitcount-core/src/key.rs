//! Counter identity: a namespace (the site) plus a key (the counter).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key used when a path derives to nothing.
pub const HOME_KEY: &str = "home";

/// Prefix applied to per-page counter keys.
pub const PAGE_PREFIX: &str = "page-";

/// Identifies one remote counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub namespace: String,
    pub key: String,
}

impl CounterKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Per-page counter for a URL path, e.g. `/blog/Post_1` -> `page-blog-post-1`.
    pub fn for_page(namespace: impl Into<String>, path: &str) -> Self {
        Self::new(namespace, format!("{PAGE_PREFIX}{}", derive_page_key(path)))
    }

    /// Flat `namespace:key` form used for storage keys and log fields.
    pub fn storage_id(&self) -> String {
        format!("{}:{}", self.namespace, self.key)
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

/// Collapses a URL path into a slug of `[a-z0-9-]`.
///
/// Runs of anything non-alphanumeric become a single hyphen and edge hyphens
/// are trimmed. An empty result maps to [`HOME_KEY`]. Applying the function to
/// its own output returns the output unchanged.
pub fn derive_page_key(path: &str) -> String {
    let mut slug = String::with_capacity(path.len());
    let mut pending_hyphen = false;

    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        HOME_KEY.to_string()
    } else {
        slug
    }
}
