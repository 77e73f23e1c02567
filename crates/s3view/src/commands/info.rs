//! `info` handler: deployment metadata.

use std::fmt::Write;

use s3view_core::{Catalog, StaticInfo};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(info: &StaticInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Application:  {}", info.application_title);
    let _ = writeln!(out, "Version:      {}", info.software_version);
    if !info.tile_server_url.is_empty() {
        let _ = writeln!(out, "Tile server:  {}", info.tile_server_url);
    }
    let _ = writeln!(out, "Max images:   {}", info.max_images_display_count);
    for group in &info.image_groups {
        let types: Vec<&str> = group
            .types
            .iter()
            .map(|t| {
                if t.display_name.is_empty() {
                    t.name.as_str()
                } else {
                    t.display_name.as_str()
                }
            })
            .collect();
        let _ = writeln!(out, "Group {:<8} {} [{}]", group.name, group.bucket, types.join(", "));
    }
    out.trim_end().to_owned()
}

pub async fn handle(catalog: &Catalog, global: &GlobalOpts) -> Result<(), CliError> {
    let info = catalog.static_info().await?;
    let out = output::render_single(&global.output, &info, detail, |i| {
        i.software_version.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
