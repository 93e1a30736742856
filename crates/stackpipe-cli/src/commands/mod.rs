//! CLI command implementations.

pub mod build;
pub mod synth;
pub mod validate;

use anyhow::{Context, Result};
use stackpipe_config::{Settings, resolve_from_env};
use stackpipe_core::DeploymentConfig;
use std::path::Path;

/// Resolve the required inputs and settings; fails before anything is declared.
pub fn load(settings_path: Option<&Path>) -> Result<(DeploymentConfig, Settings)> {
    let config = resolve_from_env().context("Invalid deployment configuration")?;
    let settings =
        Settings::load_or_default(settings_path).context("Failed to load settings")?;
    let config = config.with_region(settings.region.clone());
    Ok((config, settings))
}
