//! Client-side catalog synchronization engine for s3view.
//!
//! Keeps a local, ordered image catalog in step with the backend:
//!
//! - **[`Catalog`]** — Facade managing the lifecycle:
//!   [`connect()`](Catalog::connect) loads the listing and bridges the
//!   notification stream into the store; [`request_image_details()`](Catalog::request_image_details)
//!   hydrates one image, discarding superseded responses.
//!
//! - **[`CatalogStore`]** — [`SummaryStore`] and [`DetailStore`], both
//!   built on a `DashMap` + `tokio::sync::watch` collection ordered by
//!   modification time, newest first.
//!
//! - **[`reconcile`]** — Pure decision function mapping one
//!   [`LifecycleEvent`] and the current summary to a [`Decision`].
//!
//! - **[`Coalescer`]** — Per-key debouncer for detail refetches
//!   triggered while a [`ViewScope`] is open.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod debounce;
pub mod error;
mod hydrate;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::CatalogBackend;
pub use catalog::{Catalog, CatalogUpdate, ConnectionState, Hydration, ViewScope};
pub use config::{CatalogConfig, DEFAULT_DEBOUNCE, TlsVerification};
pub use debounce::{Coalescer, RefetchAction};
pub use error::CoreError;
pub use reconcile::{Decision, reconcile};
pub use store::{CatalogStore, DetailStore, SummaryStore};
pub use stream::{CatalogStream, FilterOptions, SummaryFilter};

pub use model::{
    Detail, DynamicInput, EventKind, Facet, Features, GeonamesPatch, LifecycleEvent, Link,
    LinkKind, ObjectKey, ParseKeyError, PreviewPayload, SubjectType, Summary,
};

// Wire types that appear in this crate's public API.
pub use s3view_api::{ImageRecord, StaticInfo, SummaryRecord, TimeRange, WireEvent};
