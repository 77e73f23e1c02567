// ── Summary filtering ──
//
// Filters snapshots in memory without re-querying the backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::model::Summary;

/// Listing filter.
///
/// `groups` maps a group name to the image types selected within it; an
/// empty type set selects the whole group and an empty map selects every
/// group. `search` matches name or key case-insensitively. For every
/// constrained `dynamic` attribute the summary's value must be one of the
/// allowed values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFilter {
    pub groups: BTreeMap<String, BTreeSet<String>>,
    pub search: Option<String>,
    pub dynamic: BTreeMap<String, BTreeSet<String>>,
}

impl SummaryFilter {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.search.is_none() && self.dynamic.is_empty()
    }

    /// Select `group`, optionally narrowed to `image_type`.
    pub fn with_group(mut self, group: impl Into<String>, image_type: Option<String>) -> Self {
        let types = self.groups.entry(group.into()).or_default();
        if let Some(t) = image_type {
            types.insert(t);
        }
        self
    }

    pub fn with_search(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.search = (!needle.is_empty()).then_some(needle);
        self
    }

    /// Allow `value` for `attribute`. Repeated calls for one attribute widen it.
    pub fn with_dynamic(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.dynamic
            .entry(attribute.into())
            .or_default()
            .insert(value.into());
        self
    }

    pub fn matches(&self, summary: &Summary) -> bool {
        if !self.groups.is_empty() {
            match self.groups.get(&summary.group) {
                Some(types) if types.is_empty() || types.contains(&summary.image_type) => {}
                _ => return false,
            }
        }

        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let hit = summary.name.to_lowercase().contains(&needle)
                || summary.object_key().to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        self.dynamic.iter().all(|(attr, allowed)| {
            allowed.is_empty()
                || summary
                    .dynamic_filters
                    .get(attr)
                    .is_some_and(|value| allowed.contains(value))
        })
    }

    /// The matching summaries, in snapshot order.
    pub fn apply(&self, summaries: &[Arc<Summary>]) -> Vec<Arc<Summary>> {
        summaries
            .iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect()
    }
}

/// Values available for filtering, gathered from a set of summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// group → image types seen in it.
    pub groups: BTreeMap<String, BTreeSet<String>>,
    /// dynamic attribute → values seen for it.
    pub dynamic: BTreeMap<String, BTreeSet<String>>,
}

impl FilterOptions {
    pub fn collect<'a>(summaries: impl IntoIterator<Item = &'a Summary>) -> Self {
        let mut options = Self::default();
        for summary in summaries {
            options.add(summary);
        }
        options
    }

    pub fn add(&mut self, summary: &Summary) {
        let types = self.groups.entry(summary.group.clone()).or_default();
        if !summary.image_type.is_empty() {
            types.insert(summary.image_type.clone());
        }
        for (attr, value) in &summary.dynamic_filters {
            self.dynamic
                .entry(attr.clone())
                .or_default()
                .insert(value.clone());
        }
    }

    /// Union of both option sets.
    pub fn merge(&mut self, other: &Self) {
        for (group, types) in &other.groups {
            self.groups
                .entry(group.clone())
                .or_default()
                .extend(types.iter().cloned());
        }
        for (attr, values) in &other.dynamic {
            self.dynamic
                .entry(attr.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::ObjectKey;

    fn summary(key: &str, group: &str, image_type: &str, sensor: &str) -> Summary {
        Summary {
            key: ObjectKey::new("b", key),
            name: key.rsplit('/').next().unwrap().to_owned(),
            group: group.into(),
            image_type: image_type.into(),
            dynamic_filters: BTreeMap::from([("sensor".to_owned(), sensor.to_owned())]),
            features: None,
            cache_key: None,
            last_modified: Utc.timestamp_opt(1, 0).unwrap(),
            has_pending_detail: false,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = SummaryFilter::default();
        assert!(f.is_empty());
        assert!(f.matches(&summary("x/a", "sat", "optical", "s2")));
    }

    #[test]
    fn group_and_type_selection() {
        let whole_group = SummaryFilter::default().with_group("sat", None);
        assert!(whole_group.matches(&summary("a", "sat", "sar", "s1")));
        assert!(!whole_group.matches(&summary("a", "aerial", "rgb", "s1")));

        let narrowed = SummaryFilter::default().with_group("sat", Some("optical".into()));
        assert!(narrowed.matches(&summary("a", "sat", "optical", "s2")));
        assert!(!narrowed.matches(&summary("a", "sat", "sar", "s1")));
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_key() {
        let f = SummaryFilter::default().with_search("LISBON");
        assert!(f.matches(&summary("2026/lisbon-01", "sat", "optical", "s2")));
        assert!(f.matches(&summary("lisbon/scene", "sat", "optical", "s2")));
        assert!(!f.matches(&summary("porto/scene", "sat", "optical", "s2")));
    }

    #[test]
    fn dynamic_attributes_must_all_match() {
        let f = SummaryFilter::default().with_dynamic("sensor", "s2");
        assert!(f.matches(&summary("a", "sat", "optical", "s2")));
        assert!(!f.matches(&summary("a", "sat", "optical", "s1")));

        let either = f.clone().with_dynamic("sensor", "s1");
        assert!(either.matches(&summary("a", "sat", "optical", "s1")));

        let unknown_attr = SummaryFilter::default().with_dynamic("cloud", "low");
        assert!(!unknown_attr.matches(&summary("a", "sat", "optical", "s2")));
    }

    #[test]
    fn apply_keeps_snapshot_order() {
        let snapshot: Vec<Arc<Summary>> = [
            summary("c", "sat", "optical", "s2"),
            summary("a", "sat", "sar", "s1"),
            summary("b", "sat", "optical", "s2"),
        ]
        .into_iter()
        .map(Arc::new)
        .collect();

        let kept = SummaryFilter::default()
            .with_group("sat", Some("optical".into()))
            .apply(&snapshot);
        let keys: Vec<&str> = kept.iter().map(|s| s.object_key()).collect();
        assert_eq!(keys, vec!["c", "b"]);
    }

    #[test]
    fn options_collect_and_merge() {
        let a = [summary("a", "sat", "optical", "s2")];
        let b = [summary("b", "sat", "sar", "s1"), summary("c", "aerial", "rgb", "s2")];

        let mut options = FilterOptions::collect(&a);
        options.merge(&FilterOptions::collect(&b));

        assert_eq!(
            options.groups.get("sat").unwrap().iter().collect::<Vec<_>>(),
            vec!["optical", "sar"]
        );
        assert!(options.groups.contains_key("aerial"));
        assert_eq!(options.dynamic.get("sensor").unwrap().len(), 2);
    }
}
