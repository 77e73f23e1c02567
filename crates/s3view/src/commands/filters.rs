//! `filters` handler: what the loaded catalog can be filtered by.

use serde::Serialize;
use tabled::Tabled;

use s3view_core::{Catalog, FilterOptions};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// One filterable attribute and the values observed for it.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct FilterEntry {
    kind: &'static str,
    attribute: String,
    values: Vec<String>,
}

#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Values")]
    values: String,
}

impl From<&FilterEntry> for FilterRow {
    fn from(e: &FilterEntry) -> Self {
        Self {
            kind: e.kind.into(),
            attribute: e.attribute.clone(),
            values: e.values.join(", "),
        }
    }
}

fn entries(options: &FilterOptions) -> Vec<FilterEntry> {
    let groups = options.groups.iter().map(|(group, types)| FilterEntry {
        kind: "group",
        attribute: group.clone(),
        values: types.iter().cloned().collect(),
    });
    let dynamic = options.dynamic.iter().map(|(attr, values)| FilterEntry {
        kind: "dynamic",
        attribute: attr.clone(),
        values: values.iter().cloned().collect(),
    });
    groups.chain(dynamic).collect()
}

pub async fn handle(catalog: &Catalog, global: &GlobalOpts) -> Result<(), CliError> {
    catalog.load_summaries(None).await?;
    let listed = entries(&catalog.filter_options());

    let out = output::render_list(
        &global.output,
        &listed,
        |e| FilterRow::from(e),
        |e| format!("{}={}", e.attribute, e.values.join(",")),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    #[test]
    fn groups_come_before_dynamic_attributes() {
        let options = FilterOptions {
            groups: BTreeMap::from([(
                "sat".to_owned(),
                BTreeSet::from(["sar".to_owned(), "optical".to_owned()]),
            )]),
            dynamic: BTreeMap::from([("sensor".to_owned(), BTreeSet::from(["s2".to_owned()]))]),
        };
        let entries = entries(&options);
        assert_eq!(
            entries,
            vec![
                FilterEntry {
                    kind: "group",
                    attribute: "sat".into(),
                    values: vec!["optical".into(), "sar".into()],
                },
                FilterEntry {
                    kind: "dynamic",
                    attribute: "sensor".into(),
                    values: vec!["s2".into()],
                },
            ]
        );
        assert_eq!(FilterRow::from(&entries[0]).values, "optical, sar");
    }
}
