// Wire models for the backend's GraphQL responses and WebSocket frames.
//
// Field names follow the backend's camelCase JSON. Everything optional on
// the wire is `#[serde(default)]` so partial GraphQL selections decode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Shared ──────────────────────────────────────────────────────────

/// Cache bookkeeping attached to every object the backend serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedObject {
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cache_key: String,
}

// ── Summaries ───────────────────────────────────────────────────────

/// Lightweight listing record, as returned by `getAllImageSummaries`
/// and as the payload of `preview` events.
///
/// The backend inlines `lastModified`/`cacheKey` at the top level in some
/// responses and nests them under `cachedObject` in others; both decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub bucket: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(rename = "type", default)]
    pub image_type: String,
    #[serde(default)]
    pub dynamic_filters: BTreeMap<String, String>,
    #[serde(default)]
    pub features: Option<FeaturesRecord>,
    #[serde(default)]
    pub cached_object: Option<CachedObject>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cache_key: Option<String>,
}

impl SummaryRecord {
    /// Modification time, wherever the backend put it.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.last_modified.or_else(|| {
            self.cached_object
                .as_ref()
                .and_then(|c| c.last_modified)
        })
    }

    /// Object key, falling back to the display name for older backends
    /// that only send `name`.
    pub fn object_key(&self) -> &str {
        if self.key.is_empty() {
            &self.name
        } else {
            &self.key
        }
    }
}

// ── Facets ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesRecord {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub objects: BTreeMap<String, u64>,
    #[serde(default)]
    pub cached_object: Option<CachedObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPlace {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeonamesCounty {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cities: Vec<NamedPlace>,
    #[serde(default)]
    pub villages: Vec<NamedPlace>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeonamesState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub counties: Vec<GeonamesCounty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeonamesObject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub states: Vec<GeonamesState>,
}

/// Geographic names extracted for an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeonamesRecord {
    /// Display-name override carried by `geonames` events.
    #[serde(default)]
    pub top_level: Option<String>,
    #[serde(default)]
    pub objects: Vec<GeonamesObject>,
    #[serde(default)]
    pub cached_object: Option<CachedObject>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerPoint {
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizationCorner {
    #[serde(rename = "upper-left")]
    pub upper_left: CornerPoint,
    #[serde(rename = "upper-right")]
    pub upper_right: CornerPoint,
    #[serde(rename = "lower-left")]
    pub lower_left: CornerPoint,
    #[serde(rename = "lower-right")]
    pub lower_right: CornerPoint,
}

/// Footprint corners of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationRecord {
    pub corner: LocalizationCorner,
    #[serde(default)]
    pub cached_object: Option<CachedObject>,
}

/// Target files arrive as a plain list from some backends and as a
/// `name → cache key` map from others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileList {
    Map(BTreeMap<String, String>),
    List(Vec<String>),
}

impl Default for FileList {
    fn default() -> Self {
        Self::Map(BTreeMap::new())
    }
}

impl FileList {
    /// `(file name, reference)` pairs. For list entries the file name is
    /// the last path segment of the reference.
    pub fn entries(&self) -> Vec<(String, String)> {
        match self {
            Self::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Self::List(list) => list
                .iter()
                .map(|reference| {
                    let name = reference
                        .rsplit('/')
                        .next()
                        .unwrap_or(reference.as_str())
                        .to_owned();
                    (name, reference.clone())
                })
                .collect(),
        }
    }
}

// ── Full image ──────────────────────────────────────────────────────

/// Authoritative detail record returned by `getImage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_summary: SummaryRecord,
    #[serde(default)]
    pub geonames: Option<GeonamesRecord>,
    #[serde(default)]
    pub localization: Option<LocalizationRecord>,
    #[serde(default)]
    pub features: Option<FeaturesRecord>,
    #[serde(default)]
    pub additional_files: BTreeMap<String, String>,
    #[serde(default)]
    pub target_files: FileList,
    #[serde(default)]
    pub full_product_files: BTreeMap<String, String>,
}

// ── Notifications ───────────────────────────────────────────────────

/// One lifecycle notification exactly as the backend emits it on `/api/ws`.
///
/// `object` stays raw JSON here; `s3view-core` decodes it once into the
/// facet-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    /// `ObjectCreated` / `ObjectRemoved` (possibly suffixed, e.g. `ObjectCreated:Put`).
    pub event_type: String,
    /// Facet tag: `preview`, `geonames`, `features`, ...
    pub object_type: String,
    pub image_bucket: String,
    #[serde(alias = "imageName")]
    pub image_key: String,
    pub object_time: DateTime<Utc>,
    #[serde(default)]
    pub object: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── Static info ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTypeInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGroupInfo {
    pub name: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub types: Vec<ImageTypeInfo>,
}

/// Deployment metadata served by `GET /api/info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticInfo {
    #[serde(default)]
    pub software_version: String,
    #[serde(default)]
    pub window_title: String,
    #[serde(default)]
    pub application_title: String,
    #[serde(default)]
    pub scale_initial_percentage: u32,
    #[serde(default)]
    pub max_images_display_count: u32,
    #[serde(default, rename = "tileServerURL")]
    pub tile_server_url: String,
    #[serde(default)]
    pub image_groups: Vec<ImageGroupInfo>,
}
