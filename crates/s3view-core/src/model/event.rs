// ── Lifecycle events ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::ObjectKey;
use super::summary::{Features, PreviewPayload};

/// Whether a facet object appeared or disappeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum EventKind {
    Created,
    Removed,
}

/// Known facet tags.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubjectType {
    Preview,
    Geonames,
    Localization,
    Additional,
    Features,
    Target,
    #[strum(to_string = "full_product", serialize = "full-product")]
    FullProduct,
    #[strum(to_string = "dynamic_input", serialize = "dynamic-input")]
    DynamicInput,
}

/// `geonames` payload: only the display-name override matters here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeonamesPatch {
    pub top_level: Option<String>,
}

/// `dynamic_input` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicInput {
    pub input_file: Option<String>,
}

/// What changed, with the payload decoded once for the facets that carry
/// one. A payload of `None` means the event had none or it did not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    Preview(Option<PreviewPayload>),
    Geonames(Option<GeonamesPatch>),
    Localization,
    Additional,
    Features(Option<Features>),
    Target,
    FullProduct,
    DynamicInput(Option<DynamicInput>),
    /// Any tag this client does not recognise.
    Other(String),
}

impl Facet {
    pub fn subject_type(&self) -> Option<SubjectType> {
        Some(match self {
            Self::Preview(_) => SubjectType::Preview,
            Self::Geonames(_) => SubjectType::Geonames,
            Self::Localization => SubjectType::Localization,
            Self::Additional => SubjectType::Additional,
            Self::Features(_) => SubjectType::Features,
            Self::Target => SubjectType::Target,
            Self::FullProduct => SubjectType::FullProduct,
            Self::DynamicInput(_) => SubjectType::DynamicInput,
            Self::Other(_) => return None,
        })
    }

    /// Tag for logging.
    pub fn tag(&self) -> &str {
        match self {
            Self::Other(tag) => tag,
            known => known.subject_type().map_or("", <&'static str>::from),
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, Self::Preview(_))
    }
}

/// One normalized notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub key: ObjectKey,
    pub timestamp: DateTime<Utc>,
    pub facet: Facet,
    /// Backend-side processing error reported alongside the event.
    pub error: Option<String>,
}
