//! Per-session URL deduplication

use std::collections::HashSet;

/// URLs already accepted in the current session
///
/// Acceptance is a single test-and-insert, so a URL surfaced by several
/// adapters is only ever processed once.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url`; returns `false` if it was already present
    pub fn insert(&mut self, url: &str) -> bool {
        if self.seen.insert(url.to_string()) {
            self.order.push(url.to_string());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Accepted URLs in first-seen order
    pub fn urls(&self) -> &[String] {
        &self.order
    }
}
