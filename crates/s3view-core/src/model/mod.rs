// ── Domain model ──
//
// Canonical catalog types. Wire records from `s3view-api` are converted
// into these in `crate::convert`; nothing above the conversion layer sees
// raw JSON.

mod detail;
mod event;
mod key;
mod summary;

pub use detail::{Detail, Link, LinkKind};
pub use event::{DynamicInput, EventKind, Facet, GeonamesPatch, LifecycleEvent, SubjectType};
pub use key::{ObjectKey, ParseKeyError};
pub use summary::{Features, PreviewPayload, Summary};
