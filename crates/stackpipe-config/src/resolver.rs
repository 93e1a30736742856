//! Resolution of the required process environment inputs.

use crate::{ConfigError, ConfigResult};
use stackpipe_core::environment::DEFAULT_REGION;
use stackpipe_core::{AccountId, DeploymentConfig, DeploymentEnvironment, ResourceName};
use tracing::{debug, info};

pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";
pub const MAIN_RESOURCES_NAME_VAR: &str = "MAIN_RESOURCES_NAME";
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";

/// Resolve the deployment configuration from the process environment.
pub fn resolve_from_env() -> ConfigResult<DeploymentConfig> {
    resolve_with(|name| std::env::var(name).ok())
}

/// Resolve the deployment configuration through `lookup`.
///
/// Inputs are checked in a fixed order and the first missing or invalid one
/// aborts resolution; nothing is partially built.
pub fn resolve_with<F>(lookup: F) -> ConfigResult<DeploymentConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |name: &str| -> ConfigResult<String> {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingVariable(name.to_string()))
    };

    let raw_environment = required(ENVIRONMENT_VAR)?;
    let raw_name = required(MAIN_RESOURCES_NAME_VAR)?;
    let raw_account = required(ACCOUNT_VAR)?;

    let environment = DeploymentEnvironment::parse(&raw_environment).ok_or_else(|| {
        debug!(value = %raw_environment, "Rejected deployment environment");
        ConfigError::InvalidEnvironment(raw_environment.clone())
    })?;

    let resource_name =
        ResourceName::new(&raw_name).map_err(|e| ConfigError::InvalidValue {
            field: MAIN_RESOURCES_NAME_VAR.to_string(),
            message: e.to_string(),
        })?;

    let account = AccountId::new(&raw_account).map_err(|e| ConfigError::InvalidValue {
        field: ACCOUNT_VAR.to_string(),
        message: e.to_string(),
    })?;

    info!(environment = %environment, "Environment for deployment resolved");

    Ok(DeploymentConfig::new(
        environment,
        resource_name,
        account,
        DEFAULT_REGION,
    ))
}
