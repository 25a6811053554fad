// ABOUTME: A per-session discovery cache keyed by normalized page URL.
// ABOUTME: Callers own the cache and decide its lifetime; the engine only reads and writes it.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::specifier::FeedSpecifier;

/// Remembers discovery results so repeated lookups of the same page skip
/// the network entirely.
#[derive(Default)]
pub struct DiscoveryCache {
    inner: Mutex<HashMap<String, Vec<FeedSpecifier>>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page_url: &str) -> Option<Vec<FeedSpecifier>> {
        match self.inner.lock() {
            Ok(map) => map.get(page_url).cloned(),
            Err(_) => None,
        }
    }

    pub fn insert(&self, page_url: &str, specifiers: Vec<FeedSpecifier>) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(page_url.to_string(), specifiers);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
