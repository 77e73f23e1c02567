#![allow(clippy::unwrap_used)]

// Catalog behaviour against a scripted in-memory backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use s3view_core::{
    Catalog, CatalogBackend, CatalogConfig, ConnectionState, CoreError, Decision, Hydration,
    ImageRecord, ObjectKey, Summary, SummaryRecord, TimeRange, WireEvent,
};
use serde_json::json;
use url::Url;

// ── Fake backend ────────────────────────────────────────────────────

#[derive(Default)]
struct FakeBackend {
    listing: Mutex<Vec<SummaryRecord>>,
    fail_listing: AtomicBool,
    /// Scripted detail responses: `(delay, record)`; `None` means not found.
    details: Mutex<VecDeque<(Duration, Option<ImageRecord>)>>,
    detail_calls: AtomicUsize,
}

impl FakeBackend {
    fn script(&self, delay: Duration, record: Option<ImageRecord>) {
        self.details.lock().unwrap().push_back((delay, record));
    }

    fn calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

impl CatalogBackend for FakeBackend {
    fn fetch_summaries(
        &self,
        _range: Option<TimeRange>,
    ) -> BoxFuture<'_, Result<Vec<SummaryRecord>, CoreError>> {
        Box::pin(async move {
            if self.fail_listing.load(Ordering::SeqCst) {
                return Err(CoreError::Api {
                    message: "backend down".into(),
                    status: Some(503),
                });
            }
            Ok(self.listing.lock().unwrap().clone())
        })
    }

    fn fetch_detail<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<ImageRecord, CoreError>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.details.lock().unwrap().pop_front();
        Box::pin(async move {
            let (delay, response) =
                scripted.unwrap_or_else(|| (Duration::ZERO, Some(record(key, "img"))));
            tokio::time::sleep(delay).await;
            response.ok_or_else(|| CoreError::NotFound {
                key: key.to_string(),
            })
        })
    }

    fn resolve_cache_key(&self, cache_key: &str) -> Option<Url> {
        Url::parse("http://backend/api/cache/").unwrap().join(cache_key).ok()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn catalog() -> (Catalog, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::default());
    let mut config = CatalogConfig::new(Url::parse("http://backend/").unwrap());
    config.websocket_enabled = false;
    (Catalog::with_backend(config, backend.clone()), backend)
}

fn key() -> ObjectKey {
    ObjectKey::new("b", "dir/img")
}

fn summary_json(name: &str, modified: &str) -> serde_json::Value {
    json!({
        "bucket": "b",
        "key": format!("dir/{name}"),
        "name": name,
        "group": "sat",
        "type": "optical",
        "lastModified": modified,
        "cacheKey": format!("b/dir/{name}/preview.jpg")
    })
}

fn record(key: &ObjectKey, name: &str) -> ImageRecord {
    serde_json::from_value(json!({
        "imageSummary": {
            "bucket": key.bucket(),
            "key": key.key(),
            "name": name,
            "group": "sat",
            "type": "optical",
            "lastModified": "2026-03-01T09:00:00Z"
        },
        "additionalFiles": { "meta.json": "b/dir/img/meta.json" }
    }))
    .unwrap()
}

fn wire(event_type: &str, object_type: &str, at: &str, object: serde_json::Value) -> WireEvent {
    serde_json::from_value(json!({
        "eventType": event_type,
        "objectType": object_type,
        "imageBucket": "b",
        "imageKey": "dir/img",
        "objectTime": at,
        "object": object
    }))
    .unwrap()
}

fn seed(catalog: &Catalog) {
    let decision = catalog
        .apply_wire_event(&wire(
            "ObjectCreated",
            "preview",
            "2026-03-01T10:00:00Z",
            summary_json("img", "2026-03-01T10:00:00Z"),
        ))
        .unwrap();
    assert!(matches!(decision, Decision::Insert(_)));
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn preview_for_new_key_lands_first() {
    let (catalog, backend) = catalog();
    *backend.listing.lock().unwrap() = vec![
        serde_json::from_value(summary_json("older", "2026-02-01T00:00:00Z")).unwrap(),
    ];
    catalog.load_summaries(None).await.unwrap();

    seed(&catalog);

    let store = &catalog.store().summaries;
    assert_eq!(store.len(), 2);
    assert_eq!(store.find_index(&key()), Some(0));
    let summary = catalog.summary(&key()).unwrap();
    assert!(!summary.has_pending_detail);
    assert_eq!(summary.cache_key.as_deref(), Some("b/dir/img/preview.jpg"));
}

#[tokio::test]
async fn features_event_patches_and_marks_pending() {
    let (catalog, _) = catalog();
    seed(&catalog);

    catalog.apply_wire_event(&wire(
        "ObjectCreated:Put",
        "features",
        "2026-03-01T10:05:00Z",
        json!({ "class": "vessel", "count": 2, "objects": { "ship": 2 } }),
    ));

    let summary = catalog.summary(&key()).unwrap();
    assert!(summary.has_pending_detail);
    assert_eq!(summary.features.as_ref().unwrap().count, 2);
    assert_eq!(summary.last_modified.to_rfc3339(), "2026-03-01T10:05:00+00:00");
}

#[tokio::test]
async fn removed_preview_drops_summary_and_detail() {
    let (catalog, _) = catalog();
    seed(&catalog);
    catalog.request_image_details(&key(), None).await.unwrap();
    assert!(catalog.detail(&key()).is_some());

    let decision = catalog
        .apply_wire_event(&wire("ObjectRemoved", "preview", "2026-03-01T11:00:00Z", json!(null)))
        .unwrap();

    assert_eq!(decision, Decision::Remove(key()));
    assert!(catalog.summary(&key()).is_none());
    assert!(catalog.detail(&key()).is_none());
}

fn snapshot(catalog: &Catalog) -> Vec<Summary> {
    catalog.summaries().iter().map(|s| (**s).clone()).collect()
}

#[tokio::test]
async fn repeated_preview_leaves_store_unchanged() {
    let (catalog, backend) = catalog();
    *backend.listing.lock().unwrap() = vec![
        serde_json::from_value(summary_json("older", "2026-02-01T00:00:00Z")).unwrap(),
    ];
    catalog.load_summaries(None).await.unwrap();

    seed(&catalog);
    let once = snapshot(&catalog);
    catalog.apply_wire_event(&wire(
        "ObjectCreated",
        "preview",
        "2026-03-01T10:00:00Z",
        summary_json("img", "2026-03-01T10:00:00Z"),
    ));

    assert_eq!(snapshot(&catalog), once);
}

#[tokio::test]
async fn repeated_removal_is_a_no_op() {
    let (catalog, _) = catalog();
    seed(&catalog);
    let removed = wire("ObjectRemoved", "preview", "2026-03-01T11:00:00Z", json!(null));

    catalog.apply_wire_event(&removed);
    let after_first = snapshot(&catalog);
    let version = catalog.store().summaries.version();
    assert!(after_first.is_empty());

    let decision = catalog.apply_wire_event(&removed).unwrap();
    assert_eq!(decision, Decision::Remove(key()));
    assert_eq!(snapshot(&catalog), after_first);
    assert_eq!(catalog.store().summaries.version(), version);
    assert!(catalog.detail(&key()).is_none());
}

#[tokio::test]
async fn removed_facet_flags_pending_only() {
    let (catalog, _) = catalog();
    seed(&catalog);
    let before = catalog.summary(&key()).unwrap();

    catalog.apply_wire_event(&wire(
        "ObjectRemoved:Delete",
        "localization",
        "2026-03-01T11:00:00Z",
        json!(null),
    ));

    let after = catalog.summary(&key()).unwrap();
    assert!(after.has_pending_detail);
    assert_eq!(after.last_modified, before.last_modified);
}

#[tokio::test]
async fn unknown_event_kind_is_dropped() {
    let (catalog, _) = catalog();
    seed(&catalog);
    let version = catalog.store().summaries.version();

    let outcome = catalog.apply_wire_event(&wire(
        "ObjectRestored",
        "preview",
        "2026-03-01T11:00:00Z",
        json!(null),
    ));

    assert!(outcome.is_none());
    assert_eq!(catalog.store().summaries.version(), version);
}

#[tokio::test]
async fn updates_are_broadcast() {
    let (catalog, _) = catalog();
    let mut updates = catalog.updates();
    seed(&catalog);

    let update = updates.recv().await.unwrap();
    assert_eq!(update.event.key, key());
    assert_eq!(update.decision.label(), "insert");
    assert!(catalog.store().last_event().is_some());
}

#[tokio::test(start_paused = true)]
async fn superseded_fetch_is_discarded() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    backend.script(Duration::from_secs(3), Some(record(&key(), "stale")));
    backend.script(Duration::from_secs(1), Some(record(&key(), "fresh")));

    let k = key();
    let (first, second) = tokio::join!(
        catalog.request_image_details(&k, None),
        catalog.request_image_details(&k, None),
    );

    assert!(matches!(first.unwrap(), Hydration::Superseded));
    let fresh = second.unwrap();
    assert_eq!(fresh.detail().unwrap().summary.name, "fresh");
    assert_eq!(catalog.detail(&key()).unwrap().summary.name, "fresh");
    assert_eq!(catalog.summary(&key()).unwrap().name, "fresh");
}

#[tokio::test(start_paused = true)]
async fn removal_during_fetch_discards_response() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    backend.script(Duration::from_secs(2), Some(record(&key(), "late")));

    let pending = {
        let catalog = catalog.clone();
        tokio::spawn(async move { catalog.request_image_details(&key(), None).await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    catalog.apply_wire_event(&wire("ObjectRemoved", "preview", "2026-03-01T11:00:00Z", json!(null)));

    let outcome = pending.await.unwrap().unwrap();
    assert!(matches!(outcome, Hydration::Superseded));
    assert!(catalog.summary(&key()).is_none());
    assert!(catalog.detail(&key()).is_none());
}

#[tokio::test(start_paused = true)]
async fn reload_during_fetch_discards_pruned_response() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    backend.script(Duration::from_secs(2), Some(record(&key(), "late")));
    *backend.listing.lock().unwrap() =
        vec![serde_json::from_value(summary_json("other", "2026-03-02T00:00:00Z")).unwrap()];

    let pending = {
        let catalog = catalog.clone();
        tokio::spawn(async move { catalog.request_image_details(&key(), None).await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    catalog.load_summaries(None).await.unwrap();

    let outcome = pending.await.unwrap().unwrap();
    assert!(matches!(outcome, Hydration::Superseded));
    assert!(catalog.detail(&key()).is_none());
    assert_eq!(catalog.store().details.len(), 0);
}

#[tokio::test]
async fn unlisted_detail_is_returned_but_not_stored() {
    let (catalog, _) = catalog();

    let hydration = catalog.request_image_details(&key(), None).await.unwrap();

    assert_eq!(hydration.detail().unwrap().summary.name, "img");
    assert!(catalog.summary(&key()).is_none());
    assert!(catalog.detail(&key()).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_events_and_backfills_stay_serial() {
    let (catalog, _) = catalog();
    seed(&catalog);

    for round in 0..50 {
        let events = {
            let catalog = catalog.clone();
            tokio::spawn(async move {
                catalog.apply_wire_event(&wire(
                    "ObjectCreated",
                    "features",
                    "2026-03-01T10:05:00Z",
                    json!({ "class": "vessel", "count": round, "objects": {} }),
                ));
            })
        };
        let fetch = {
            let catalog = catalog.clone();
            tokio::spawn(async move { catalog.request_image_details(&key(), None).await })
        };
        events.await.unwrap();
        fetch.await.unwrap().unwrap();

        // Either the event or the back-fill applied last, never a blend.
        let summary = catalog.summary(&key()).unwrap();
        match &summary.features {
            Some(features) => {
                assert!(summary.has_pending_detail);
                assert_eq!(features.count, round);
            }
            None => assert!(!summary.has_pending_detail),
        }
    }
}

#[tokio::test]
async fn detail_fetch_backfills_summary() {
    let (catalog, _) = catalog();
    seed(&catalog);
    catalog.store().summaries.mark_pending(&key());

    let hydration = catalog.request_image_details(&key(), None).await.unwrap();
    let detail = hydration.detail().unwrap();
    assert_eq!(detail.links.len(), 1);
    assert_eq!(
        detail.links[0].url.as_str(),
        "http://backend/api/cache/b/dir/img/meta.json"
    );

    let summary = catalog.summary(&key()).unwrap();
    assert!(!summary.has_pending_detail);
    // The event timestamp is newer than the record's and wins.
    assert_eq!(summary.last_modified.to_rfc3339(), "2026-03-01T10:00:00+00:00");
}

#[tokio::test]
async fn failed_fetch_leaves_stores_untouched() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    catalog.store().summaries.mark_pending(&key());
    backend.script(Duration::ZERO, None);

    let err = catalog.request_image_details(&key(), None).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(catalog.detail(&key()).is_none());
    assert!(catalog.summary(&key()).unwrap().has_pending_detail);
}

#[tokio::test(start_paused = true)]
async fn dynamic_input_burst_refetches_once_while_view_open() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    let view = catalog.open_view(key());

    for at in [
        "2026-03-01T10:00:01Z",
        "2026-03-01T10:00:02Z",
        "2026-03-01T10:00:03Z",
    ] {
        let decision = catalog
            .apply_wire_event(&wire("ObjectCreated", "dynamic_input", at, json!({})))
            .unwrap();
        assert!(matches!(decision, Decision::Patch { needs_refetch: true, .. }));
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(backend.calls(), 1);
    assert!(catalog.detail(&key()).is_some());
    view.close();
}

#[tokio::test(start_paused = true)]
async fn dynamic_input_without_view_is_ignored() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    let before = catalog.summary(&key()).unwrap();

    let decision = catalog
        .apply_wire_event(&wire(
            "ObjectCreated",
            "dynamic-input",
            "2026-03-01T10:00:05Z",
            json!({}),
        ))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(decision, Decision::NoOp { stale: None });
    assert_eq!(backend.calls(), 0);
    assert_eq!(catalog.summary(&key()).unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn closing_view_cancels_timer_and_fetch() {
    let (catalog, backend) = catalog();
    seed(&catalog);

    // Pending timer: closing before it fires means no fetch at all.
    let view = catalog.open_view(key());
    catalog.apply_wire_event(&wire(
        "ObjectCreated",
        "dynamic_input",
        "2026-03-01T10:00:01Z",
        json!({}),
    ));
    view.close();
    assert!(!catalog.is_view_open(&key()));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.calls(), 0);

    // In-flight fetch: closing aborts it and nothing is stored.
    backend.script(Duration::from_secs(5), Some(record(&key(), "late")));
    let view = catalog.open_view(key());
    let token = view.token().clone();
    let pending = {
        let catalog = catalog.clone();
        tokio::spawn(async move { catalog.request_image_details(&key(), Some(&token)).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    drop(view);

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(CoreError::Cancelled { .. })));
    assert!(catalog.detail(&key()).is_none());
}

#[tokio::test]
async fn view_stays_open_until_last_scope_closes() {
    let (catalog, _) = catalog();
    let first = catalog.open_view(key());
    let second = catalog.open_view(key());

    first.close();
    assert!(catalog.is_view_open(&key()));
    assert!(!second.token().is_cancelled());

    let token = second.token().clone();
    second.close();
    assert!(!catalog.is_view_open(&key()));
    assert!(token.is_cancelled());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn connect_loads_listing_newest_first() {
    let (catalog, backend) = catalog();
    *backend.listing.lock().unwrap() = vec![
        serde_json::from_value(summary_json("a", "2026-01-01T00:00:00Z")).unwrap(),
        serde_json::from_value(summary_json("c", "2026-03-01T00:00:00Z")).unwrap(),
        serde_json::from_value(summary_json("b", "2026-02-01T00:00:00Z")).unwrap(),
    ];

    catalog.connect().await.unwrap();

    assert_eq!(*catalog.connection_state().borrow(), ConnectionState::Connected);
    let names: Vec<String> = catalog.summaries().iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["c", "b", "a"]);
    assert!(catalog.store().last_full_refresh().is_some());

    catalog.disconnect().await;
    assert_eq!(
        *catalog.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn failed_listing_marks_connection_failed() {
    let (catalog, backend) = catalog();
    backend.fail_listing.store(true, Ordering::SeqCst);

    let err = catalog.connect().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(*catalog.connection_state().borrow(), ConnectionState::Failed);
}

#[tokio::test]
async fn reload_prunes_vanished_summaries() {
    let (catalog, backend) = catalog();
    seed(&catalog);
    *backend.listing.lock().unwrap() =
        vec![serde_json::from_value(summary_json("other", "2026-03-02T00:00:00Z")).unwrap()];

    let count = catalog.load_summaries(None).await.unwrap();

    assert_eq!(count, 1);
    assert!(catalog.summary(&key()).is_none());
    assert!(catalog.summary(&ObjectKey::new("b", "dir/other")).is_some());
}
