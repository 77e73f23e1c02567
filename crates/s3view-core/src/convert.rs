// ── Wire → domain conversion ──
//
// The only place that looks at raw backend records. Event payloads are
// decoded exactly once here, into the facet variant their tag selects.

use chrono::{DateTime, Utc};
use s3view_api::{FeaturesRecord, SummaryRecord, WireEvent};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{
    DynamicInput, EventKind, Facet, Features, GeonamesPatch, LifecycleEvent, ObjectKey,
    PreviewPayload, SubjectType, Summary,
};

impl From<FeaturesRecord> for Features {
    fn from(r: FeaturesRecord) -> Self {
        Self {
            class: r.class,
            count: r.count,
            objects: r.objects,
        }
    }
}

impl From<SummaryRecord> for PreviewPayload {
    fn from(r: SummaryRecord) -> Self {
        let cache_key = r
            .cache_key
            .or_else(|| r.cached_object.map(|c| c.cache_key))
            .filter(|k| !k.is_empty());
        Self {
            name: r.name,
            group: r.group,
            image_type: r.image_type,
            dynamic_filters: r.dynamic_filters,
            features: r.features.map(Features::from),
            cache_key,
        }
    }
}

impl From<SummaryRecord> for Summary {
    /// Records without a timestamp sort after everything else.
    fn from(r: SummaryRecord) -> Self {
        let key = ObjectKey::new(r.bucket.clone(), r.object_key());
        let last_modified = r.modified_at().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        PreviewPayload::from(r).to_summary(key, last_modified)
    }
}

/// Parse `ObjectCreated…` / `ObjectRemoved…`, with or without an `s3:`
/// prefix and any trailing qualifier (`ObjectCreated:Put`).
pub fn parse_event_kind(raw: &str) -> Result<EventKind, CoreError> {
    let bare = raw.strip_prefix("s3:").unwrap_or(raw);
    if bare.starts_with("ObjectCreated") {
        Ok(EventKind::Created)
    } else if bare.starts_with("ObjectRemoved") {
        Ok(EventKind::Removed)
    } else {
        Err(CoreError::UnknownEventKind {
            value: raw.to_owned(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeonamesPayload {
    #[serde(default)]
    top_level: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DynamicInputPayload {
    #[serde(default)]
    input_file: Option<String>,
}

/// Decode `object` as `T`; a missing or undecodable payload is `None`.
fn payload<T: DeserializeOwned>(wire: &WireEvent) -> Option<T> {
    let object = wire.object.as_ref().filter(|v| !v.is_null())?;
    match serde_json::from_value(object.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(
                bucket = %wire.image_bucket,
                key = %wire.image_key,
                subject = %wire.object_type,
                error = %e,
                "undecodable event payload, treating as absent"
            );
            None
        }
    }
}

fn facet(wire: &WireEvent) -> Facet {
    let Ok(subject) = wire.object_type.parse::<SubjectType>() else {
        return Facet::Other(wire.object_type.clone());
    };
    match subject {
        SubjectType::Preview => {
            Facet::Preview(payload::<SummaryRecord>(wire).map(PreviewPayload::from))
        }
        SubjectType::Geonames => Facet::Geonames(
            payload::<GeonamesPayload>(wire).map(|p| GeonamesPatch {
                top_level: p.top_level.filter(|t| !t.is_empty()),
            }),
        ),
        SubjectType::Features => {
            Facet::Features(payload::<FeaturesRecord>(wire).map(Features::from))
        }
        SubjectType::DynamicInput => Facet::DynamicInput(
            payload::<DynamicInputPayload>(wire).map(|p| DynamicInput {
                input_file: p.input_file,
            }),
        ),
        SubjectType::Localization => Facet::Localization,
        SubjectType::Additional => Facet::Additional,
        SubjectType::Target => Facet::Target,
        SubjectType::FullProduct => Facet::FullProduct,
    }
}

impl TryFrom<&WireEvent> for LifecycleEvent {
    type Error = CoreError;

    fn try_from(wire: &WireEvent) -> Result<Self, Self::Error> {
        let kind = parse_event_kind(&wire.event_type)?;
        if wire.image_bucket.is_empty() || wire.image_key.is_empty() {
            return Err(CoreError::MalformedEvent {
                reason: "event without bucket or key".into(),
            });
        }
        Ok(Self {
            kind,
            key: ObjectKey::new(wire.image_bucket.clone(), wire.image_key.clone()),
            timestamp: wire.object_time,
            facet: facet(wire),
            error: wire.error.clone().filter(|e| !e.is_empty()),
        })
    }
}
