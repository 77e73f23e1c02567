//! `list` handler: load the listing, filter, print.

use std::sync::Arc;

use tabled::Tabled;

use s3view_core::{Catalog, Summary, SummaryFilter, TimeRange};

use crate::cli::{GlobalOpts, ListArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Bucket")]
    bucket: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Type")]
    image_type: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Pending")]
    pending: String,
}

impl From<&Arc<Summary>> for SummaryRow {
    fn from(s: &Arc<Summary>) -> Self {
        Self {
            bucket: s.bucket().to_owned(),
            key: s.object_key().to_owned(),
            name: s.name.clone(),
            group: s.group.clone(),
            image_type: s.image_type.clone(),
            modified: output::short_time(&s.last_modified),
            pending: if s.has_pending_detail { "yes".into() } else { String::new() },
        }
    }
}

fn build_filter(args: &ListArgs) -> SummaryFilter {
    let mut filter = SummaryFilter::default();
    if let Some(ref group) = args.group {
        filter = filter.with_group(group.clone(), args.image_type.clone());
    }
    if let Some(ref needle) = args.search {
        filter = filter.with_search(needle.clone());
    }
    for (attr, value) in &args.filters {
        filter = filter.with_dynamic(attr.clone(), value.clone());
    }
    filter
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(catalog: &Catalog, args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let range = (args.from.is_some() || args.to.is_some()).then_some(TimeRange {
        from: args.from,
        to: args.to,
    });
    let total = catalog.load_summaries(range).await?;

    let mut rows = catalog.filtered(&build_filter(&args));
    tracing::debug!(total, matched = rows.len(), "filtered listing");
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    let out = output::render_list(
        &global.output,
        &rows,
        |s| SummaryRow::from(s),
        |s| s.key.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use s3view_core::ObjectKey;

    use super::*;

    fn summary(group: &str, image_type: &str, sensor: &str) -> Summary {
        Summary {
            key: ObjectKey::new("b", format!("{group}/{image_type}")),
            name: format!("{group}-{image_type}"),
            group: group.into(),
            image_type: image_type.into(),
            dynamic_filters: BTreeMap::from([("sensor".to_owned(), sensor.to_owned())]),
            features: None,
            cache_key: None,
            last_modified: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            has_pending_detail: false,
        }
    }

    fn args() -> ListArgs {
        ListArgs {
            group: None,
            image_type: None,
            search: None,
            filters: Vec::new(),
            from: None,
            to: None,
            limit: None,
        }
    }

    #[test]
    fn empty_args_match_everything() {
        let filter = build_filter(&args());
        assert!(filter.is_empty());
    }

    #[test]
    fn group_type_and_attributes_combine() {
        let filter = build_filter(&ListArgs {
            group: Some("sat".into()),
            image_type: Some("optical".into()),
            filters: vec![("sensor".into(), "s2".into())],
            ..args()
        });
        assert!(filter.matches(&summary("sat", "optical", "s2")));
        assert!(!filter.matches(&summary("sat", "sar", "s2")));
        assert!(!filter.matches(&summary("sat", "optical", "s1")));
        assert!(!filter.matches(&summary("aerial", "optical", "s2")));
    }

    #[test]
    fn pending_flag_is_shown() {
        let mut s = summary("sat", "optical", "s2");
        s.has_pending_detail = true;
        let row = SummaryRow::from(&Arc::new(s));
        assert_eq!(row.pending, "yes");
        assert_eq!(row.key, "sat/optical");
        assert_eq!(row.modified, "2026-03-01 10:00");
    }
}
