//! Content-addressed summary stores
//!
//! The summarizer never owns a global cache: callers inject a
//! [`SummaryStore`] so tests can start from an empty store and production can
//! pick a bounded one.

use dashmap::DashMap;
use govplan_artifact::{ContentHash, SectionSummary};
use moka::sync::Cache;
use std::fmt::Debug;

/// Concurrent key → summary store
pub trait SummaryStore: Send + Sync + Debug {
    /// Look up a summary
    fn get(&self, key: &ContentHash) -> Option<SectionSummary>;

    /// Store a summary
    fn insert(&self, key: ContentHash, summary: SectionSummary);

    /// Approximate number of entries
    fn entry_count(&self) -> u64;

    /// Drop every entry
    fn clear(&self);
}

/// Bounded store backed by moka
///
/// Evicts least-recently-used entries once `max_capacity` is reached.
#[derive(Debug, Clone)]
pub struct MokaSummaryStore {
    inner: Cache<ContentHash, SectionSummary>,
}

impl MokaSummaryStore {
    /// Create store with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }
}

impl Default for MokaSummaryStore {
    /// Create store with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl SummaryStore for MokaSummaryStore {
    fn get(&self, key: &ContentHash) -> Option<SectionSummary> {
        self.inner.get(key)
    }

    fn insert(&self, key: ContentHash, summary: SectionSummary) {
        self.inner.insert(key, summary);
    }

    fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }
}

/// Unbounded in-memory store backed by dashmap
#[derive(Debug, Default)]
pub struct MemorySummaryStore {
    inner: DashMap<ContentHash, SectionSummary>,
}

impl MemorySummaryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SummaryStore for MemorySummaryStore {
    fn get(&self, key: &ContentHash) -> Option<SectionSummary> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: ContentHash, summary: SectionSummary) {
        self.inner.insert(key, summary);
    }

    fn entry_count(&self) -> u64 {
        self.inner.len() as u64
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str) -> SectionSummary {
        SectionSummary {
            section_id: id.to_string(),
            ..SectionSummary::default()
        }
    }

    fn exercise(store: &dyn SummaryStore) {
        let key = ContentHash::compute(b"k");
        assert!(store.get(&key).is_none());

        store.insert(key, summary("sec-1"));
        assert_eq!(store.get(&key).unwrap().section_id, "sec-1");
        assert_eq!(store.entry_count(), 1);

        store.clear();
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn moka_store_roundtrip() {
        exercise(&MokaSummaryStore::new(16));
    }

    #[test]
    fn memory_store_roundtrip() {
        exercise(&MemorySummaryStore::new());
    }
}
