// ── Summary domain types ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::ObjectKey;

/// Per-class object detections attached to an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub class: String,
    pub count: u64,
    pub objects: BTreeMap<String, u64>,
}

/// Lightweight catalog entry, as shown in listings.
///
/// `has_pending_detail` is set whenever a facet changed after the last
/// detail fetch; it is cleared only by a full preview replacement or a
/// successful detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub key: ObjectKey,
    pub name: String,
    pub group: String,
    pub image_type: String,
    pub dynamic_filters: BTreeMap<String, String>,
    pub features: Option<Features>,
    pub cache_key: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub has_pending_detail: bool,
}

impl Summary {
    pub fn bucket(&self) -> &str {
        self.key.bucket()
    }

    pub fn object_key(&self) -> &str {
        self.key.key()
    }
}

/// Summary fields carried by a `preview` creation event.
///
/// Identity and timestamp come from the event envelope, not from here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewPayload {
    pub name: String,
    pub group: String,
    pub image_type: String,
    pub dynamic_filters: BTreeMap<String, String>,
    pub features: Option<Features>,
    pub cache_key: Option<String>,
}

impl PreviewPayload {
    /// Fully formed summary for `key`, with no pending detail.
    pub fn to_summary(&self, key: ObjectKey, last_modified: DateTime<Utc>) -> Summary {
        let name = if self.name.is_empty() {
            key.file_name().to_owned()
        } else {
            self.name.clone()
        };
        Summary {
            key,
            name,
            group: self.group.clone(),
            image_type: self.image_type.clone(),
            dynamic_filters: self.dynamic_filters.clone(),
            features: self.features.clone(),
            cache_key: self.cache_key.clone(),
            last_modified,
            has_pending_detail: false,
        }
    }
}
