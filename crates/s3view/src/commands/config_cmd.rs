//! Config subcommand handlers.

use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Server")]
    server: String,
}

#[derive(serde::Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    default: bool,
    #[serde(flatten)]
    profile: &'a Profile,
}

/// Insert (or replace) a profile, making it the default if none is usable.
fn add_profile(
    cfg: &mut Config,
    name: &str,
    profile: Profile,
    force: bool,
) -> Result<(), CliError> {
    if cfg.profiles.contains_key(name) && !force {
        return Err(CliError::Conflict {
            resource_type: "profile".into(),
            identifier: name.into(),
        });
    }
    // Reject unusable servers before they reach the file.
    config::profile_to_catalog_config(&profile, &cfg.defaults)?;

    cfg.profiles.insert(name.to_owned(), profile);
    let default_usable = cfg
        .default_profile
        .as_ref()
        .is_some_and(|d| cfg.profiles.contains_key(d));
    if !default_usable {
        cfg.default_profile = Some(name.to_owned());
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let text = toml::to_string_pretty(&cfg).map_err(|e| CliError::Serialize(e.to_string()))?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| text.trim_end().to_owned(),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { name, force } => {
            let Some(server) = global.server.clone() else {
                return Err(CliError::Validation {
                    field: "server".into(),
                    reason: "config init needs --server <URL>".into(),
                });
            };
            let mut cfg = config::load_config()?;
            let profile = Profile {
                server,
                insecure: global.insecure.then_some(true),
                ..Profile::default()
            };
            add_profile(&mut cfg, &name, profile, force)?;
            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Saved profile '{name}' to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref();
            let entries: Vec<ProfileEntry<'_>> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileEntry {
                    name,
                    default: Some(name.as_str()) == default,
                    profile,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*".into() } else { String::new() },
                    name: e.name.to_owned(),
                    server: e.profile.server.clone(),
                },
                |e| e.name.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(s3view_config::ConfigError::UnknownProfile { name }.into());
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile is now '{name}'");
            }
            Ok(())
        }
    }
}
