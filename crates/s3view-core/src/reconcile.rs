// ── Event reconciliation ──
//
// Pure decision logic: given one lifecycle event and the summary currently
// stored for its key, decide how the catalog changes. Applying the
// decision is the caller's job (see `Catalog::apply_event`), which keeps
// every rule here testable without a store or a runtime.

use tracing::{debug, warn};

use crate::model::{EventKind, Facet, LifecycleEvent, ObjectKey, Summary};

/// Outcome of reconciling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A new summary for a key that had none.
    Insert(Summary),
    /// Replacement for the existing summary.
    Patch {
        summary: Summary,
        /// An open detail view should be refreshed (debounced).
        needs_refetch: bool,
    },
    /// Drop the summary (and its detail) for this key.
    Remove(ObjectKey),
    /// Summary fields unchanged. `stale` names a key whose detail is now
    /// out of date and should be flagged pending.
    NoOp { stale: Option<ObjectKey> },
    /// Nothing to do.
    Ignore,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Patch { .. } => "patch",
            Self::Remove(_) => "remove",
            Self::NoOp { .. } => "no-op",
            Self::Ignore => "ignore",
        }
    }
}

/// Decide the effect of `event` given the `existing` summary for its key.
///
/// `hydrated` is true while a detail view is open for the key; only then
/// do `dynamic_input` events touch the catalog.
pub fn reconcile(event: &LifecycleEvent, existing: Option<&Summary>, hydrated: bool) -> Decision {
    match (event.kind, existing) {
        (EventKind::Created, None) => match &event.facet {
            Facet::Preview(Some(preview)) => {
                Decision::Insert(preview.to_summary(event.key.clone(), event.timestamp))
            }
            Facet::Preview(None) => {
                warn!(key = %event.key, "preview event without summary payload, ignoring");
                Decision::Ignore
            }
            other => {
                debug!(key = %event.key, subject = other.tag(), "facet for unknown key, ignoring");
                Decision::Ignore
            }
        },
        (EventKind::Created, Some(current)) => patch(event, current, hydrated),
        (EventKind::Removed, None) => Decision::Remove(event.key.clone()),
        (EventKind::Removed, Some(_)) if event.facet.is_preview() => {
            Decision::Remove(event.key.clone())
        }
        (EventKind::Removed, Some(_)) => Decision::NoOp {
            stale: Some(event.key.clone()),
        },
    }
}

fn patch(event: &LifecycleEvent, current: &Summary, hydrated: bool) -> Decision {
    let mut summary = current.clone();
    let mut needs_refetch = false;

    match &event.facet {
        Facet::Preview(Some(preview)) => {
            summary = preview.to_summary(event.key.clone(), event.timestamp);
        }
        Facet::Geonames(patch) => {
            summary.name = patch
                .as_ref()
                .and_then(|p| p.top_level.clone())
                .unwrap_or_else(|| event.key.file_name().to_owned());
            summary.has_pending_detail = true;
        }
        Facet::Features(Some(features)) => {
            summary.features = Some(features.clone());
            summary.has_pending_detail = true;
        }
        Facet::DynamicInput(_) => {
            if !hydrated {
                return Decision::NoOp { stale: None };
            }
            needs_refetch = true;
        }
        Facet::Preview(None)
        | Facet::Features(None)
        | Facet::Localization
        | Facet::Additional
        | Facet::Target
        | Facet::FullProduct
        | Facet::Other(_) => {
            summary.has_pending_detail = true;
        }
    }

    summary.last_modified = event.timestamp;
    Decision::Patch {
        summary,
        needs_refetch,
    }
}
