//! CLI configuration: a thin layer over `s3view_config` that applies the
//! `GlobalOpts` overrides (--server, --insecure, --timeout).

use std::time::Duration;

use s3view_core::{CatalogConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use s3view_config::{
    Config, Profile, config_path, load_config, load_config_or_default, profile_to_catalog_config,
    save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `CatalogConfig` for commands that talk to the backend.
///
/// Flag values win over the profile, the profile over `[defaults]`. With
/// no matching profile, `--server` alone is enough.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<CatalogConfig, CliError> {
    let name = active_profile_name(global, config);

    let mut profile = match config.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.server.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(s3view_config::ConfigError::UnknownProfile { name }.into());
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }

    let mut catalog = profile_to_catalog_config(&profile, &config.defaults)?;
    if global.insecure {
        catalog.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        catalog.timeout = Duration::from_secs(secs);
    }
    tracing::debug!(profile = %name, url = %catalog.url, "resolved catalog config");
    Ok(catalog)
}
