//! Memoized discovery results, owned by a single payload.

use std::collections::HashMap;

use tracing::trace;

use crate::discovery::DiscoveryResult;

/// Request signature of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveryKey {
    pub path: Option<String>,
    pub recursive: bool,
}

impl DiscoveryKey {
    /// Signature of the default request: whole tree, recursive.
    pub fn canonical() -> Self {
        Self {
            path: None,
            recursive: true,
        }
    }
}

/// Discovery results keyed by request signature. Entries never expire; the
/// owning payload clears them whenever its tree changes.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<DiscoveryKey, DiscoveryResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&mut self, key: DiscoveryKey, producer: F) -> &DiscoveryResult
    where
        F: FnOnce() -> DiscoveryResult,
    {
        if self.entries.contains_key(&key) {
            trace!(?key, "discovery cache hit");
        }
        self.entries.entry(key).or_insert_with(producer)
    }

    pub fn invalidate(&mut self, key: &DiscoveryKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
