// ── Summary store ──

use std::sync::Arc;

use super::collection::KeyedCollection;
use crate::model::{ObjectKey, Summary};
use crate::stream::CatalogStream;

/// Ordered collection of [`Summary`] records, unique by object key and
/// sorted most recently modified first.
pub struct SummaryStore {
    inner: KeyedCollection<Summary>,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self {
            inner: KeyedCollection::new(),
        }
    }

    /// Insert, or replace the summary with the same key.
    pub fn upsert(&self, summary: Summary) {
        self.inner.upsert(summary);
    }

    /// Remove the summary for `key`; absent keys are a no-op.
    pub fn remove(&self, key: &ObjectKey) -> Option<Arc<Summary>> {
        self.inner.remove(key)
    }

    /// Position of `key` in [`all`](Self::all).
    pub fn find_index(&self, key: &ObjectKey) -> Option<usize> {
        self.inner.position(key)
    }

    pub fn find(&self, key: &ObjectKey) -> Option<Arc<Summary>> {
        self.inner.get(key)
    }

    /// Every summary, newest first.
    pub fn all(&self) -> Arc<Vec<Arc<Summary>>> {
        self.inner.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Flag `key` as having a stale detail. Returns `false` if absent.
    pub fn mark_pending(&self, key: &ObjectKey) -> bool {
        self.inner.update(key, |s| s.has_pending_detail = true)
    }

    /// Bulk load: upsert every summary, then prune keys not present.
    /// Returns the pruned keys.
    pub fn replace_all(&self, summaries: Vec<Summary>) -> Vec<ObjectKey> {
        self.inner.replace_all(summaries)
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.inner.version()
    }

    pub fn subscribe(&self) -> CatalogStream<Summary> {
        CatalogStream::new(self.inner.subscribe())
    }
}

impl Default for SummaryStore {
    fn default() -> Self {
        Self::new()
    }
}
