//! Named parameters published to the external parameter store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DeploymentConfig, Result};

/// Field holding the resolved resource name.
pub const MAIN_RESOURCES_NAME_FIELD: &str = "main_resources_name";
/// Field holding the resolved environment name.
pub const ENVIRONMENT_FIELD: &str = "environment";

/// A key-value pair persisted under `/<environment>/<resource-name>/<field>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedParameter {
    /// Last path segment.
    pub field: String,
    pub path: String,
    pub value: String,
    pub description: String,
}

impl NamedParameter {
    pub fn new(config: &DeploymentConfig, field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            path: config.parameter_path(field),
            value: value.into(),
            description: format!(
                "Parameter for {} solution in {} environment",
                config.resource_name(),
                config.environment()
            ),
        }
    }
}

/// Read access to the parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the plain value stored at `path`.
    async fn get(&self, path: &str) -> Result<String>;
}
