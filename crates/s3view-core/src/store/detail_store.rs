// ── Detail store ──

use std::sync::Arc;

use super::collection::KeyedCollection;
use crate::model::{Detail, ObjectKey};
use crate::stream::CatalogStream;

/// Hydrated [`Detail`] records, at most one per object key.
///
/// Writes go through [`CatalogStore::upsert_detail`](super::CatalogStore::upsert_detail)
/// so the matching summary is refreshed in the same step.
pub struct DetailStore {
    inner: KeyedCollection<Detail>,
}

impl DetailStore {
    pub fn new() -> Self {
        Self {
            inner: KeyedCollection::new(),
        }
    }

    pub(crate) fn upsert(&self, detail: Detail) -> Arc<Detail> {
        self.inner.upsert(detail)
    }

    pub fn find(&self, key: &ObjectKey) -> Option<Arc<Detail>> {
        self.inner.get(key)
    }

    pub fn remove(&self, key: &ObjectKey) -> Option<Arc<Detail>> {
        self.inner.remove(key)
    }

    pub fn all(&self) -> Arc<Vec<Arc<Detail>>> {
        self.inner.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn subscribe(&self) -> CatalogStream<Detail> {
        CatalogStream::new(self.inner.subscribe())
    }
}

impl Default for DetailStore {
    fn default() -> Self {
        Self::new()
    }
}
