// ── Detail normalization ──
//
// Turns a raw `ImageRecord` into a display-ready `Detail`: formatted
// timestamp, every file reference resolved to a browsable URL.

use chrono::{DateTime, Utc};
use s3view_api::ImageRecord;
use tracing::warn;
use url::Url;

use crate::backend::CatalogBackend;
use crate::model::{Detail, Features, Link, LinkKind, ObjectKey, Summary};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Build the `Detail` for `key` from a fetched record.
///
/// `key` wins over whatever identity the record carries.
pub(crate) fn hydrate(
    key: &ObjectKey,
    record: ImageRecord,
    backend: &dyn CatalogBackend,
    fetched_at: DateTime<Utc>,
) -> Detail {
    let modified = record.image_summary.modified_at();
    let mut summary = Summary::from(record.image_summary);
    summary.key = key.clone();

    let features = record
        .features
        .map(Features::from)
        .or_else(|| summary.features.clone());
    if features.is_some() {
        summary.features.clone_from(&features);
    }

    let mut links: Vec<Link> = Vec::new();
    let listings = [
        (LinkKind::Additional, file_pairs(&record.additional_files)),
        (LinkKind::Target, record.target_files.entries()),
        (LinkKind::FullProduct, file_pairs(&record.full_product_files)),
    ];
    for (kind, entries) in listings {
        for (file_name, reference) in entries {
            match resolve_link(&reference, backend) {
                Some(url) => links.push(Link {
                    kind,
                    file_name,
                    url,
                }),
                None => warn!(%key, %reference, "unresolvable file reference, skipping"),
            }
        }
    }
    links.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.file_name.cmp(&b.file_name)));

    Detail {
        summary,
        geonames: record.geonames.map(|g| g.objects).unwrap_or_default(),
        localization: record.localization.map(|l| l.corner),
        features,
        links,
        display_modified: modified.map_or_else(
            || "unknown".to_owned(),
            |t| t.format(DISPLAY_FORMAT).to_string(),
        ),
        fetched_at,
    }
}

fn file_pairs(map: &std::collections::BTreeMap<String, String>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Absolute http(s) references pass through; anything else is a cache key.
fn resolve_link(reference: &str, backend: &dyn CatalogBackend) -> Option<Url> {
    match Url::parse(reference) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => backend.resolve_cache_key(reference),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use futures_util::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use s3view_api::{FileList, SummaryRecord, TimeRange};

    use super::*;
    use crate::error::CoreError;

    struct CacheOnly;

    impl CatalogBackend for CacheOnly {
        fn fetch_summaries(
            &self,
            _range: Option<TimeRange>,
        ) -> BoxFuture<'_, Result<Vec<SummaryRecord>, CoreError>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn fetch_detail<'a>(
            &'a self,
            key: &'a ObjectKey,
        ) -> BoxFuture<'a, Result<ImageRecord, CoreError>> {
            Box::pin(async move {
                Err(CoreError::NotFound {
                    key: key.to_string(),
                })
            })
        }

        fn resolve_cache_key(&self, cache_key: &str) -> Option<Url> {
            Url::parse("https://host/viewer/api/cache/")
                .unwrap()
                .join(cache_key)
                .ok()
        }
    }

    fn record() -> ImageRecord {
        ImageRecord {
            image_summary: SummaryRecord {
                bucket: "other".into(),
                key: "ignored".into(),
                name: "scene".into(),
                group: "sat".into(),
                image_type: "optical".into(),
                last_modified: Some("2026-03-01T10:04:05Z".parse().unwrap()),
                ..SummaryRecord::default()
            },
            additional_files: BTreeMap::from([
                ("z-notes.txt".into(), "b/scene/z-notes.txt".into()),
                ("a-meta.json".into(), "https://cdn.example.com/a-meta.json".into()),
            ]),
            target_files: FileList::List(vec!["b/scene/t2.tif".into(), "b/scene/t1.tif".into()]),
            ..ImageRecord::default()
        }
    }

    #[test]
    fn hydrate_normalizes_identity_time_and_links() {
        let key = ObjectKey::new("b", "dir/scene");
        let detail = hydrate(&key, record(), &CacheOnly, Utc::now());

        assert_eq!(detail.summary.key, key);
        assert!(!detail.summary.has_pending_detail);
        assert_eq!(detail.display_modified, "2026-03-01 10:04:05 UTC");

        let links: Vec<(&str, &str)> = detail
            .links
            .iter()
            .map(|l| (l.file_name.as_str(), l.url.as_str()))
            .collect();
        assert_eq!(
            links,
            vec![
                ("a-meta.json", "https://cdn.example.com/a-meta.json"),
                ("z-notes.txt", "https://host/viewer/api/cache/b/scene/z-notes.txt"),
                ("t1.tif", "https://host/viewer/api/cache/b/scene/t1.tif"),
                ("t2.tif", "https://host/viewer/api/cache/b/scene/t2.tif"),
            ]
        );
        assert_eq!(detail.links_of(LinkKind::Target).count(), 2);
    }

    #[test]
    fn missing_timestamp_displays_unknown() {
        let mut r = record();
        r.image_summary.last_modified = None;
        let detail = hydrate(&ObjectKey::new("b", "k"), r, &CacheOnly, Utc::now());
        assert_eq!(detail.display_modified, "unknown");
    }
}
