//! Parameter publisher.
//!
//! Publishes the resolved resource name and environment so the build stage can
//! read them through the unmasked parameter lookup instead of injected
//! environment variables (which the build service redacts in its logs).

use stackpipe_core::parameter::{ENVIRONMENT_FIELD, MAIN_RESOURCES_NAME_FIELD, NamedParameter};
use stackpipe_core::{DeploymentConfig, Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// The two parameters the build stage reads, resource name first.
pub fn publish_parameters(config: &DeploymentConfig) -> Result<Vec<NamedParameter>> {
    let parameters = vec![
        NamedParameter::new(
            config,
            MAIN_RESOURCES_NAME_FIELD,
            config.resource_name().as_str(),
        ),
        NamedParameter::new(config, ENVIRONMENT_FIELD, config.environment().as_str()),
    ];

    let mut seen = HashSet::new();
    for parameter in &parameters {
        if !seen.insert(parameter.path.as_str()) {
            return Err(Error::Conflict(format!(
                "parameter path {} is declared twice",
                parameter.path
            )));
        }
        debug!(path = %parameter.path, "Declared parameter");
    }

    Ok(parameters)
}

/// Logical id of a parameter resource, e.g. `MainResourcesNameParameter`.
pub fn logical_id(parameter: &NamedParameter) -> String {
    let mut id: String = parameter
        .field
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    id.push_str("Parameter");
    id
}
