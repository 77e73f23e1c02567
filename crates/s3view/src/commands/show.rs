//! `show` handler: hydrate one image and print its detail.

use std::fmt::Write;

use s3view_core::{Catalog, Detail, Hydration, LinkKind, ObjectKey};

use crate::cli::{GlobalOpts, ShowArgs};
use crate::error::CliError;
use crate::output;

fn detail(d: &Detail) -> String {
    let s = &d.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Name:      {}", s.name);
    let _ = writeln!(out, "Key:       {}", s.key);
    let _ = writeln!(out, "Group:     {}", s.group);
    let _ = writeln!(out, "Type:      {}", s.image_type);
    let _ = writeln!(out, "Modified:  {}", d.display_modified);
    if let Some(ref cache_key) = s.cache_key {
        let _ = writeln!(out, "Preview:   {cache_key}");
    }
    for (attr, value) in &s.dynamic_filters {
        let _ = writeln!(out, "{:<10} {value}", format!("{attr}:"));
    }

    if let Some(ref features) = d.features {
        let _ = writeln!(out, "\nFeatures:  {} ({})", features.class, features.count);
        for (object, count) in &features.objects {
            let _ = writeln!(out, "  {object:<20} {count}");
        }
    }

    let places = d.place_names();
    if !places.is_empty() {
        let _ = writeln!(out, "\nPlaces:    {}", places.join(", "));
    }

    if let Some(ref corner) = d.localization {
        let _ = writeln!(out, "\nFootprint:");
        for (label, point) in [
            ("upper-left", &corner.upper_left),
            ("upper-right", &corner.upper_right),
            ("lower-right", &corner.lower_right),
            ("lower-left", &corner.lower_left),
        ] {
            let _ = writeln!(
                out,
                "  {label:<12} {:.5}, {:.5}",
                point.coordinates.lat, point.coordinates.lon
            );
        }
    }

    for kind in [LinkKind::Additional, LinkKind::Target, LinkKind::FullProduct] {
        let mut links = d.links_of(kind).peekable();
        if links.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "\n{kind} files:");
        for link in links {
            let _ = writeln!(out, "  {:<24} {}", link.file_name, link.url);
        }
    }

    out.trim_end().to_owned()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(catalog: &Catalog, args: ShowArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let key = ObjectKey::new(args.bucket, args.key);
    let view = catalog.open_view(key.clone());
    let hydration = catalog.refresh_view(&view).await;
    view.close();

    let found = match hydration? {
        Hydration::Fresh(detail) => Some(detail),
        Hydration::Superseded => catalog.detail(&key),
    };
    let Some(found) = found else {
        return Err(CliError::NotFound {
            resource_type: "image".into(),
            identifier: key.to_string(),
            list_command: "list".into(),
        });
    };

    let out = output::render_single(
        &global.output,
        &found,
        |d| detail(d),
        |d| d.summary.key.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
