//! Group prefix matching.
//!
//! # Responsibilities
//! - Keep group middleware in an ordered `(prefix, handlers)` table
//! - Compute the middleware chain for a route's full pattern
//! - Join base paths and patterns with a single separator
//!
//! # Design Decisions
//! - Precedence is registration order: the first registration of a prefix
//!   fixes its position, later handlers for it are appended
//! - Path matching is a case-sensitive plain string prefix test
//! - Chains are computed once per route at freeze time, never per request

use crate::http::handler::BoxHandler;

/// Matches a route pattern against a group prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

struct GroupEntry {
    matcher: PathPrefixMatcher,
    handlers: Vec<BoxHandler>,
}

/// Ordered table of group middleware.
#[derive(Default)]
pub struct GroupTable {
    entries: Vec<GroupEntry>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list of `prefix`.
    pub fn add(&mut self, prefix: &str, handler: BoxHandler) {
        match self.entries.iter_mut().find(|e| e.matcher.prefix() == prefix) {
            Some(entry) => entry.handlers.push(handler),
            None => self.entries.push(GroupEntry {
                matcher: PathPrefixMatcher::new(prefix),
                handlers: vec![handler],
            }),
        }
    }

    /// Middleware that applies to `path`, in execution order.
    pub fn chain_for(&self, path: &str) -> Vec<BoxHandler> {
        self.entries
            .iter()
            .filter(|e| e.matcher.matches(path))
            .flat_map(|e| e.handlers.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for GroupTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.matcher.prefix(), e.handlers.len())),
            )
            .finish()
    }
}

/// Join `base` and `path` with exactly one `/` between them.
///
/// The result always starts with `/`; a trailing slash on `path` is kept.
pub fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    let mut joined = String::with_capacity(base.len() + path.len() + 2);
    if !base.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(base);
    if !path.is_empty() {
        if !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(path);
    }
    joined
}
