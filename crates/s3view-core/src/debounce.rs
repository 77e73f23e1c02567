// ── Debounce coalescer ──
//
// Collapses bursts of refetch signals per object key. The first signal
// arms a timer for the quiet period; signals arriving while it is armed
// are absorbed (the window is not extended). When the timer fires the
// entry is released before the action runs, so a burst during an
// in-flight fetch opens a fresh window. At most one action runs per key at
// a time; a window that closes mid-flight queues a single rerun.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::model::ObjectKey;

/// Work performed once a key's quiet period elapses.
pub trait RefetchAction: Send + Sync + 'static {
    fn refetch(&self, key: ObjectKey) -> BoxFuture<'static, ()>;
}

struct Armed {
    id: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct KeyState {
    timer: Option<Armed>,
    in_flight: bool,
    rerun: bool,
}

impl KeyState {
    fn is_idle(&self) -> bool {
        self.timer.is_none() && !self.in_flight && !self.rerun
    }
}

struct Inner {
    quiet: Duration,
    action: Arc<dyn RefetchAction>,
    keys: DashMap<ObjectKey, KeyState>,
    next_timer: AtomicU64,
}

/// Per-key debouncer for detail refetches.
#[derive(Clone)]
pub struct Coalescer {
    inner: Arc<Inner>,
}

impl Coalescer {
    pub fn new(quiet: Duration, action: Arc<dyn RefetchAction>) -> Self {
        Self {
            inner: Arc::new(Inner {
                quiet,
                action,
                keys: DashMap::new(),
                next_timer: AtomicU64::new(0),
            }),
        }
    }

    /// Request a refetch of `key`. Returns `true` if this signal armed a
    /// new timer, `false` if it was absorbed by one already running.
    pub fn signal(&self, key: ObjectKey) -> bool {
        let (id, token) = {
            let mut state = self.inner.keys.entry(key.clone()).or_default();
            if state.timer.is_some() {
                trace!(%key, "refetch signal absorbed");
                return false;
            }
            let id = self.inner.next_timer.fetch_add(1, Ordering::Relaxed);
            let token = CancellationToken::new();
            state.timer = Some(Armed {
                id,
                token: token.clone(),
            });
            (id, token)
        };

        debug!(%key, quiet_ms = duration_ms(self.inner.quiet), "refetch timer armed");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => trace!(%key, "refetch timer cancelled"),
                () = tokio::time::sleep(inner.quiet) => inner.fire(key, id).await,
            }
        });
        true
    }

    /// Disarm any timer for `key` and drop a queued rerun. An action
    /// already running is left to finish.
    pub fn cancel(&self, key: &ObjectKey) {
        let armed = self.inner.keys.get_mut(key).and_then(|mut state| {
            state.rerun = false;
            state.timer.take()
        });
        if let Some(armed) = armed {
            debug!(%key, "refetch timer disarmed");
            armed.token.cancel();
        }
        self.inner.keys.remove_if(key, |_, state| state.is_idle());
    }

    /// Disarm every timer.
    pub fn cancel_all(&self) {
        let mut tokens = Vec::new();
        for mut state in self.inner.keys.iter_mut() {
            state.rerun = false;
            tokens.extend(state.timer.take().map(|armed| armed.token));
        }
        for token in tokens {
            token.cancel();
        }
        self.inner.keys.retain(|_, state| !state.is_idle());
    }

    /// Whether a timer is armed for `key`.
    pub fn is_armed(&self, key: &ObjectKey) -> bool {
        self.inner
            .keys
            .get(key)
            .is_some_and(|state| state.timer.is_some())
    }

    /// Number of keys with an armed timer.
    pub fn armed_count(&self) -> usize {
        self.inner
            .keys
            .iter()
            .filter(|state| state.timer.is_some())
            .count()
    }
}

impl Inner {
    async fn fire(&self, key: ObjectKey, id: u64) {
        let start = match self.keys.get_mut(&key) {
            Some(mut state) if state.timer.as_ref().is_some_and(|armed| armed.id == id) => {
                state.timer = None;
                if state.in_flight {
                    state.rerun = true;
                    false
                } else {
                    state.in_flight = true;
                    true
                }
            }
            _ => {
                trace!(%key, "stale refetch timer");
                return;
            }
        };
        if !start {
            debug!(%key, "refetch already in flight, queued rerun");
            return;
        }

        loop {
            debug!(%key, "refetching");
            self.action.refetch(key.clone()).await;

            let again = match self.keys.get_mut(&key) {
                Some(mut state) if state.rerun => {
                    state.rerun = false;
                    true
                }
                Some(mut state) => {
                    state.in_flight = false;
                    false
                }
                None => false,
            };
            if !again {
                break;
            }
        }
        self.keys.remove_if(&key, |_, state| state.is_idle());
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
