// ── Central catalog store ──
//
// Pairs the summary and detail stores and keeps them consistent: a
// hydrated detail refreshes its summary, a removed summary takes its
// detail with it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::detail_store::DetailStore;
use super::summary_store::SummaryStore;
use crate::model::{Detail, ObjectKey, Summary};

pub struct CatalogStore {
    pub summaries: SummaryStore,
    pub details: DetailStore,
    last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    last_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        let (last_full_refresh, _) = watch::channel(None);
        let (last_event, _) = watch::channel(None);

        Self {
            summaries: SummaryStore::new(),
            details: DetailStore::new(),
            last_full_refresh,
            last_event,
        }
    }

    /// Store a freshly fetched detail and back-fill its summary.
    ///
    /// The summary takes the detail's name, group, type, features and
    /// dynamic filters, keeps the newer of the two timestamps, and loses
    /// its pending flag. Returns `None` without storing anything when the
    /// key has no summary, so a removed object stays removed.
    pub fn upsert_detail(&self, mut detail: Detail) -> Option<Arc<Detail>> {
        let key = detail.summary.key.clone();
        let Some(current) = self.summaries.find(&key) else {
            debug!(%key, "detail for a key without summary, not storing");
            return None;
        };
        let refreshed = Summary {
            last_modified: detail.summary.last_modified.max(current.last_modified),
            has_pending_detail: false,
            cache_key: detail
                .summary
                .cache_key
                .clone()
                .or_else(|| current.cache_key.clone()),
            ..detail.summary.clone()
        };
        detail.summary = refreshed.clone();
        self.summaries.upsert(refreshed);
        Some(self.details.upsert(detail))
    }

    /// Replace every summary with a fresh listing. Details of pruned keys
    /// are dropped too.
    pub fn apply_full_listing(&self, summaries: Vec<Summary>) -> usize {
        let count = summaries.len();
        for stale in self.summaries.replace_all(summaries) {
            self.details.remove(&stale);
        }
        self.last_full_refresh.send_replace(Some(Utc::now()));
        count
    }

    /// Remove the summary and any detail for `key`.
    pub fn remove_object(&self, key: &ObjectKey) -> Option<Arc<Summary>> {
        self.details.remove(key);
        self.summaries.remove(key)
    }

    pub(crate) fn touch_event(&self, at: DateTime<Utc>) {
        self.last_event.send_replace(Some(at));
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_event(&self) -> Option<DateTime<Utc>> {
        *self.last_event.borrow()
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}
