// ── Catalog facade ──
//
// Lifecycle management for one backend: initial listing, the notification
// bridge, event reconciliation, detail hydration and view scopes, all
// feeding the `CatalogStore`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError, Weak};

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use s3view_api::{
    BackendClient, ImageRecord, NotificationStream, StaticInfo, TimeRange, WireEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::CatalogBackend;
use crate::config::CatalogConfig;
use crate::debounce::{Coalescer, RefetchAction};
use crate::error::CoreError;
use crate::hydrate::hydrate;
use crate::model::{Detail, LifecycleEvent, ObjectKey, Summary};
use crate::reconcile::{Decision, reconcile};
use crate::store::CatalogStore;
use crate::stream::{CatalogStream, FilterOptions, SummaryFilter};

const UPDATE_CHANNEL_SIZE: usize = 256;

// ── Public types ─────────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Catching up after missed notifications.
    Reconnecting,
    Failed,
}

/// Result of a detail request.
#[derive(Debug, Clone)]
pub enum Hydration {
    /// The response was current and is now stored.
    Fresh(Arc<Detail>),
    /// A newer request for the same key was issued, or the object was
    /// removed, meanwhile; the response was discarded.
    Superseded,
}

impl Hydration {
    pub fn detail(&self) -> Option<&Arc<Detail>> {
        match self {
            Self::Fresh(detail) => Some(detail),
            Self::Superseded => None,
        }
    }
}

/// One applied event and what it did, broadcast to observers.
#[derive(Debug, Clone)]
pub struct CatalogUpdate {
    pub event: LifecycleEvent,
    pub decision: Decision,
}

/// An open detail view for one key.
///
/// While any scope is open for a key, `dynamic_input` events refresh its
/// detail. Closing (or dropping) the last scope cancels the debounce timer
/// and aborts detail fetches started under [`token`](Self::token).
pub struct ViewScope {
    key: ObjectKey,
    token: CancellationToken,
    catalog: Weak<CatalogInner>,
}

impl ViewScope {
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Cancelled when the view closes.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        if let Some(inner) = self.catalog.upgrade() {
            inner.release_view(&self.key);
        }
    }
}

impl std::fmt::Debug for ViewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewScope").field("key", &self.key).finish()
    }
}

// ── Catalog ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CatalogInner>`.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    config: CatalogConfig,
    backend: Arc<dyn CatalogBackend>,
    store: Arc<CatalogStore>,
    coalescer: Coalescer,
    sequencer: FetchSequencer,
    /// Held across every read-modify-write of the store. Never held
    /// across an `.await`.
    mutation: std::sync::Mutex<()>,
    views: DashMap<ObjectKey, ViewEntry>,
    connection_state: watch::Sender<ConnectionState>,
    update_tx: broadcast::Sender<Arc<CatalogUpdate>>,
    cancel: CancellationToken,
    /// Child token for the current connection, replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    notifications: Mutex<Option<NotificationStream>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

struct ViewEntry {
    token: CancellationToken,
    open: usize,
}

impl Catalog {
    /// Build a catalog talking HTTP to `config.url`. Does NOT connect.
    pub fn new(config: CatalogConfig) -> Result<Self, CoreError> {
        let client = BackendClient::new(config.url.clone(), &config.transport())?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    /// Build a catalog over any backend implementation.
    pub fn with_backend(config: CatalogConfig, backend: Arc<dyn CatalogBackend>) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        let debounce = config.debounce;

        let inner = Arc::new_cyclic(|weak: &Weak<CatalogInner>| CatalogInner {
            coalescer: Coalescer::new(
                debounce,
                Arc::new(ViewRefetch {
                    catalog: weak.clone(),
                }),
            ),
            config,
            backend,
            store: Arc::new(CatalogStore::new()),
            sequencer: FetchSequencer::default(),
            mutation: std::sync::Mutex::new(()),
            views: DashMap::new(),
            connection_state,
            update_tx,
            cancel: CancellationToken::new(),
            cancel_child: Mutex::new(CancellationToken::new()),
            notifications: Mutex::new(None),
            task_handles: Mutex::new(Vec::new()),
        });
        Self { inner }
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Load the listing and, if enabled, start following notifications.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        // Subscribe before loading so events published meanwhile are kept.
        let notifications = if self.inner.config.websocket_enabled {
            self.open_notifications(&child)
        } else {
            None
        };
        let rx = notifications.as_ref().map(NotificationStream::subscribe);

        if let Err(e) = self.load_summaries(None).await {
            if let Some(stream) = &notifications {
                stream.shutdown();
            }
            let _ = self.inner.connection_state.send(ConnectionState::Failed);
            return Err(e);
        }

        if let (Some(stream), Some(rx)) = (notifications, rx) {
            let bridge = tokio::spawn(notification_bridge(self.clone(), rx, child));
            self.inner.task_handles.lock().await.push(bridge);
            *self.inner.notifications.lock().await = Some(stream);
            info!("notification stream spawned (handshake in progress)");
        }

        let _ = self.inner.connection_state.send(ConnectionState::Connected);
        info!(url = %self.inner.config.url, "connected to catalog backend");
        Ok(())
    }

    /// Stop following notifications and disarm every pending refetch.
    pub async fn disconnect(&self) {
        self.inner.cancel_child.lock().await.cancel();
        self.inner.coalescer.cancel_all();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(stream) = self.inner.notifications.lock().await.take() {
            stream.shutdown();
        }

        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        debug!("disconnected from catalog backend");
    }

    fn open_notifications(&self, cancel: &CancellationToken) -> Option<NotificationStream> {
        let Some(url) = self.inner.backend.notification_url() else {
            debug!("backend has no notification endpoint");
            return None;
        };
        Some(NotificationStream::connect(
            url,
            self.inner.config.reconnect.clone(),
            cancel.child_token(),
        ))
    }

    // ── Listing ──────────────────────────────────────────────────────

    /// Fetch every summary and replace the store contents with them.
    pub async fn load_summaries(&self, range: Option<TimeRange>) -> Result<usize, CoreError> {
        let records = self.inner.backend.fetch_summaries(range).await?;
        let summaries: Vec<Summary> = records.into_iter().map(Summary::from).collect();
        let count = {
            let _guard = self.inner.lock_mutations();
            let store = &self.inner.store;
            let count = store.apply_full_listing(summaries);
            self.inner
                .sequencer
                .retain(|key| store.summaries.find(key).is_some());
            count
        };
        info!(count, "loaded image summaries");
        Ok(count)
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Normalize and apply one raw notification. Notifications that do
    /// not normalize are logged and dropped.
    pub fn apply_wire_event(&self, wire: &WireEvent) -> Option<Decision> {
        match LifecycleEvent::try_from(wire) {
            Ok(event) => Some(self.apply_event(event)),
            Err(e) => {
                warn!(
                    error = %e,
                    bucket = %wire.image_bucket,
                    key = %wire.image_key,
                    "dropping notification"
                );
                None
            }
        }
    }

    /// Reconcile one event against the store and apply the outcome.
    pub fn apply_event(&self, event: LifecycleEvent) -> Decision {
        if let Some(error) = &event.error {
            warn!(
                key = %event.key,
                subject = event.facet.tag(),
                %error,
                "backend reported a processing error"
            );
        }

        let guard = self.inner.lock_mutations();
        let store = &self.inner.store;
        let existing = store.summaries.find(&event.key);
        let hydrated = self.inner.views.contains_key(&event.key);
        let decision = reconcile(&event, existing.as_deref(), hydrated);
        debug!(
            key = %event.key,
            kind = %event.kind,
            subject = event.facet.tag(),
            decision = decision.label(),
            "applying event"
        );

        match &decision {
            Decision::Insert(summary) => store.summaries.upsert(summary.clone()),
            Decision::Patch {
                summary,
                needs_refetch,
            } => {
                store.summaries.upsert(summary.clone());
                if *needs_refetch {
                    self.inner.coalescer.signal(summary.key.clone());
                }
            }
            Decision::Remove(key) => {
                store.remove_object(key);
                self.inner.sequencer.forget(key);
                self.inner.coalescer.cancel(key);
            }
            Decision::NoOp { stale: Some(key) } => {
                store.summaries.mark_pending(key);
            }
            Decision::NoOp { stale: None } | Decision::Ignore => {}
        }
        store.touch_event(chrono::Utc::now());
        drop(guard);

        let _ = self.inner.update_tx.send(Arc::new(CatalogUpdate {
            event,
            decision: decision.clone(),
        }));
        decision
    }

    // ── Details ──────────────────────────────────────────────────────

    /// Fetch and store the detail for `key`.
    ///
    /// Only the most recently issued request per key may write; earlier
    /// ones resolve to [`Hydration::Superseded`]. Cancelling `scope`
    /// aborts the fetch. Failures leave both stores untouched.
    pub async fn request_image_details(
        &self,
        key: &ObjectKey,
        scope: Option<&CancellationToken>,
    ) -> Result<Hydration, CoreError> {
        let seq = self.inner.sequencer.begin(key);
        debug!(%key, seq, "requesting image details");

        let fetch = self.inner.backend.fetch_detail(key);
        let result = match scope {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(CoreError::Cancelled { key: key.to_string() }),
                result = fetch => result,
            },
            None => fetch.await,
        };
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(%key, error = %e, "detail fetch failed");
                return Err(e);
            }
        };

        Ok(self.store_fetched(key, seq, record))
    }

    /// Apply a fetched record unless a newer request or a removal for the
    /// key happened since `seq` was issued.
    fn store_fetched(&self, key: &ObjectKey, seq: u64, record: ImageRecord) -> Hydration {
        let _guard = self.inner.lock_mutations();
        if !self.inner.sequencer.is_latest(key, seq) {
            debug!(%key, seq, "discarding superseded detail response");
            return Hydration::Superseded;
        }

        let detail = hydrate(
            key,
            record,
            self.inner.backend.as_ref(),
            chrono::Utc::now(),
        );
        if self.inner.store.summaries.find(key).is_none() {
            // Not part of the listing: hand the detail back without
            // storing it.
            debug!(%key, "detail for an unlisted key, not storing");
            return Hydration::Fresh(Arc::new(detail));
        }
        match self.inner.store.upsert_detail(detail) {
            Some(stored) => Hydration::Fresh(stored),
            None => Hydration::Superseded,
        }
    }

    /// Open a detail view for `key`.
    pub fn open_view(&self, key: ObjectKey) -> ViewScope {
        let token = {
            let mut entry = self
                .inner
                .views
                .entry(key.clone())
                .or_insert_with(|| ViewEntry {
                    token: CancellationToken::new(),
                    open: 0,
                });
            entry.open += 1;
            entry.token.clone()
        };
        debug!(%key, "view opened");
        ViewScope {
            key,
            token,
            catalog: Arc::downgrade(&self.inner),
        }
    }

    /// Fetch the detail shown by `view`, scoped to it.
    pub async fn refresh_view(&self, view: &ViewScope) -> Result<Hydration, CoreError> {
        self.request_image_details(view.key(), Some(view.token()))
            .await
    }

    pub fn is_view_open(&self, key: &ObjectKey) -> bool {
        self.inner.views.contains_key(key)
    }

    fn view_token(&self, key: &ObjectKey) -> Option<CancellationToken> {
        self.inner.views.get(key).map(|entry| entry.token.clone())
    }

    /// Deployment metadata from the backend.
    pub async fn static_info(&self) -> Result<StaticInfo, CoreError> {
        self.inner.backend.fetch_static_info().await
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.inner.store
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Every applied event with its outcome.
    pub fn updates(&self) -> broadcast::Receiver<Arc<CatalogUpdate>> {
        self.inner.update_tx.subscribe()
    }

    pub fn summaries(&self) -> Arc<Vec<Arc<Summary>>> {
        self.inner.store.summaries.all()
    }

    pub fn summary(&self, key: &ObjectKey) -> Option<Arc<Summary>> {
        self.inner.store.summaries.find(key)
    }

    pub fn detail(&self, key: &ObjectKey) -> Option<Arc<Detail>> {
        self.inner.store.details.find(key)
    }

    /// Summaries passing `filter`, newest first.
    pub fn filtered(&self, filter: &SummaryFilter) -> Vec<Arc<Summary>> {
        filter.apply(&self.summaries())
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::collect(self.summaries().iter().map(Arc::as_ref))
    }

    pub fn subscribe_summaries(&self) -> CatalogStream<Summary> {
        self.inner.store.summaries.subscribe()
    }

    pub fn subscribe_details(&self) -> CatalogStream<Detail> {
        self.inner.store.details.subscribe()
    }
}

impl CatalogInner {
    fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_view(&self, key: &ObjectKey) {
        let last = match self.views.get_mut(key) {
            Some(mut entry) => {
                entry.open = entry.open.saturating_sub(1);
                entry.open == 0
            }
            None => false,
        };
        if !last {
            return;
        }
        if let Some((_, entry)) = self.views.remove_if(key, |_, entry| entry.open == 0) {
            entry.token.cancel();
        }
        self.coalescer.cancel(key);
        debug!(%key, "view closed");
    }
}

impl Drop for CatalogInner {
    fn drop(&mut self) {
        self.coalescer.cancel_all();
        self.cancel.cancel();
    }
}

// ── Fetch sequencing ─────────────────────────────────────────────────

/// Hands out increasing sequence numbers and remembers the latest per key.
#[derive(Default)]
struct FetchSequencer {
    counter: AtomicU64,
    latest: DashMap<ObjectKey, u64>,
}

impl FetchSequencer {
    fn begin(&self, key: &ObjectKey) -> u64 {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest.insert(key.clone(), seq);
        seq
    }

    fn is_latest(&self, key: &ObjectKey, seq: u64) -> bool {
        self.latest.get(key).is_some_and(|latest| *latest == seq)
    }

    /// Invalidate every outstanding request for `key`.
    fn forget(&self, key: &ObjectKey) {
        self.latest.remove(key);
    }

    /// Keep sequence entries only for keys matching `keep`.
    fn retain(&self, keep: impl Fn(&ObjectKey) -> bool) {
        self.latest.retain(|key, _| keep(key));
    }
}

// ── Background work ──────────────────────────────────────────────────

/// Debounced refetch for keys with an open view.
struct ViewRefetch {
    catalog: Weak<CatalogInner>,
}

impl RefetchAction for ViewRefetch {
    fn refetch(&self, key: ObjectKey) -> BoxFuture<'static, ()> {
        let catalog = self.catalog.upgrade().map(|inner| Catalog { inner });
        Box::pin(async move {
            let Some(catalog) = catalog else {
                return;
            };
            let Some(scope) = catalog.view_token(&key) else {
                debug!(%key, "view closed before refetch");
                return;
            };
            // Failures are already logged; the summary stays pending.
            let _ = catalog.request_image_details(&key, Some(&scope)).await;
        })
    }
}

/// Notifications → reconciliation.
async fn notification_bridge(
    catalog: Catalog,
    mut rx: broadcast::Receiver<Arc<WireEvent>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = rx.recv() => match result {
                Ok(wire) => {
                    catalog.apply_wire_event(&wire);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification bridge lagged, reloading summaries");
                    let state = &catalog.inner.connection_state;
                    let _ = state.send(ConnectionState::Reconnecting);
                    if let Err(e) = catalog.load_summaries(None).await {
                        warn!(error = %e, "reload after lag failed");
                    }
                    let _ = state.send(ConnectionState::Connected);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
    debug!("notification bridge exiting");
}
