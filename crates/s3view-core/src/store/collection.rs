// ── Generic reactive keyed collection ──
//
// Concurrent storage with O(1) lookups by object key and push-based
// change notification via `watch` channels. Unlike a plain map, the
// snapshot is kept ordered: most recently modified first, insertion order
// breaking ties.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::{Detail, ObjectKey, Summary};

/// Anything stored under an [`ObjectKey`] and ordered by recency.
pub trait Keyed: Clone + Send + Sync + 'static {
    fn object_key(&self) -> &ObjectKey;
    fn last_modified(&self) -> DateTime<Utc>;
}

impl Keyed for Summary {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

impl Keyed for Detail {
    fn object_key(&self) -> &ObjectKey {
        &self.summary.key
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.summary.last_modified
    }
}

struct Slot<T> {
    /// Insertion sequence; kept across updates.
    seq: u64,
    value: Arc<T>,
}

pub(crate) struct KeyedCollection<T: Keyed> {
    by_key: DashMap<ObjectKey, Slot<T>>,
    next_seq: AtomicU64,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Ordered snapshot, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Keyed> KeyedCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            next_seq: AtomicU64::new(0),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity, returning the stored value.
    pub(crate) fn upsert(&self, entity: T) -> Arc<T> {
        let stored = self.put(entity);
        self.publish();
        stored
    }

    /// Replace the value stored under `key` with `f` applied to a copy.
    /// Returns `false` when the key is absent.
    pub(crate) fn update(&self, key: &ObjectKey, f: impl FnOnce(&mut T)) -> bool {
        let updated = match self.by_key.get_mut(key) {
            Some(mut slot) => {
                let mut value = (*slot.value).clone();
                f(&mut value);
                slot.value = Arc::new(value);
                true
            }
            None => false,
        };
        if updated {
            self.publish();
        }
        updated
    }

    pub(crate) fn remove(&self, key: &ObjectKey) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, slot)| slot.value);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Upsert every item, then drop keys absent from `items`, publishing
    /// once. Subscribers never observe an empty intermediate state.
    pub(crate) fn replace_all(&self, items: Vec<T>) -> Vec<ObjectKey> {
        let incoming: HashSet<ObjectKey> = items.iter().map(|i| i.object_key().clone()).collect();
        for item in items {
            self.put(item);
        }
        let stale: Vec<ObjectKey> = self
            .by_key
            .iter()
            .filter(|r| !incoming.contains(r.key()))
            .map(|r| r.key().clone())
            .collect();
        for key in &stale {
            self.by_key.remove(key);
        }
        self.publish();
        stale
    }

    pub(crate) fn get(&self, key: &ObjectKey) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(&r.value))
    }

    /// Position of `key` in the ordered snapshot.
    pub(crate) fn position(&self, key: &ObjectKey) -> Option<usize> {
        self.snapshot
            .borrow()
            .iter()
            .position(|e| e.object_key() == key)
    }

    /// Current ordered snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn put(&self, entity: T) -> Arc<T> {
        let value = Arc::new(entity);
        match self.by_key.entry(value.object_key().clone()) {
            Entry::Occupied(mut slot) => slot.get_mut().value = Arc::clone(&value),
            Entry::Vacant(slot) => {
                slot.insert(Slot {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    value: Arc::clone(&value),
                });
            }
        }
        value
    }

    /// Rebuild the ordered snapshot and bump the version.
    fn publish(&self) {
        let mut entries: Vec<(u64, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.seq, Arc::clone(&r.value)))
            .collect();
        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            b.last_modified()
                .cmp(&a.last_modified())
                .then(seq_a.cmp(seq_b))
        });
        let values: Vec<Arc<T>> = entries.into_iter().map(|(_, v)| v).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
