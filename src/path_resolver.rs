//! Maps manifest document paths to menu URIs.
//!
//! # Example
//!
//! ```
//! use menu_sync::path_resolver::MenuPathResolver;
//!
//! let resolver = MenuPathResolver::new("docs");
//! assert_eq!(resolver.resolve("def", "guide/intro.md"), "/docs/guide/intro");
//!
//! let resolver = MenuPathResolver::new("");
//! assert_eq!(resolver.resolve("v2", "guide/intro.md"), "/guide/intro?__prefix=v2");
//! ```

use crate::root::DEFAULT_ROOT_KEY;

/// Extension stripped from document paths.
pub const CONTENT_EXTENSION: &str = ".md";

/// Query parameter the router uses to pick a non-default root.
pub const ROOT_QUERY_PARAM: &str = "__prefix";

/// Builds the URI a menu leaf points at.
///
/// Pure: the same `(root_key, path)` always yields the same URI, which the
/// router relies on when it resolves a clicked menu entry back to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuPathResolver {
    /// URL prefix the documentation is mounted under, without slashes
    prefix: String,
}

impl MenuPathResolver {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn resolve(&self, root_key: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let path = path.strip_suffix(CONTENT_EXTENSION).unwrap_or(path);

        let mut uri = String::with_capacity(self.prefix.len() + path.len() + 2);
        uri.push('/');
        if !self.prefix.is_empty() {
            uri.push_str(&self.prefix);
            uri.push('/');
        }
        uri.push_str(path);

        if root_key != DEFAULT_ROOT_KEY {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(ROOT_QUERY_PARAM);
            uri.push('=');
            uri.push_str(root_key);
        }
        uri
    }
}
