//! Deployment environment and the resolved, immutable deployment configuration.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Region used when nothing else is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Target environment of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnvironment {
    Development,
    Production,
}

impl DeploymentEnvironment {
    /// Parse a raw value, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" => Some(Self::Development),
            "production" => Some(Self::Production),
            _ => None,
        }
    }

    /// Returns true only for "development" or "production" (case-insensitive).
    pub fn is_valid(value: &str) -> bool {
        Self::parse(value).is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "environment '{}' is not valid, use 'development' or 'production'",
                s
            ))
        })
    }
}

/// Name shared by every resource of the solution (e.g. "orders").
///
/// Always lowercase, starts with a letter and only holds `[a-z0-9-]`, so it
/// is safe inside IAM role names, stack names and parameter paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(raw: &str) -> Result<Self> {
        let name = raw.trim().to_lowercase();
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(Error::InvalidInput(format!(
                "resource name '{}' must start with a letter and contain only letters, digits and '-'",
                raw
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A 12-digit cloud account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct AccountId(String);

impl AccountId {
    pub fn new(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.len() != 12 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "account '{}' must be a 12-digit identifier",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Values resolved once at startup and handed to every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    environment: DeploymentEnvironment,
    resource_name: ResourceName,
    account: AccountId,
    region: String,
}

impl DeploymentConfig {
    pub fn new(
        environment: DeploymentEnvironment,
        resource_name: ResourceName,
        account: AccountId,
        region: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            resource_name,
            account,
            region: region.into(),
        }
    }

    /// Return a copy targeting another region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn environment(&self) -> DeploymentEnvironment {
        self.environment
    }

    pub fn resource_name(&self) -> &ResourceName {
        &self.resource_name
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Prefix namespacing every created identity: `"<environment>-"`.
    pub fn name_prefix(&self) -> String {
        format!("{}-", self.environment)
    }

    /// Name of the stack holding the pipeline itself.
    pub fn synth_stack_name(&self) -> String {
        format!("{}-codepipeline-{}", self.resource_name, self.environment)
    }

    /// Name of the stack the pipeline deploys and destroys.
    pub fn main_stack_name(&self) -> String {
        format!("{}-main-stack-{}", self.resource_name, self.environment)
    }

    /// Hierarchical parameter path: `/<environment>/<resource-name>/<field>`.
    pub fn parameter_path(&self, field: &str) -> String {
        format!("/{}/{}/{}", self.environment, self.resource_name, field)
    }

    /// Prefixed physical name, e.g. `production-orders-pipeline`.
    pub fn prefixed(&self, suffix: &str) -> String {
        format!("{}{}-{}", self.name_prefix(), self.resource_name, suffix)
    }

    pub fn description(&self) -> String {
        format!(
            "CI/CD stack for {} solution in {} environment",
            self.resource_name, self.environment
        )
    }

    /// Deployment target in `aws://<account>/<region>` form.
    pub fn target(&self) -> String {
        format!("aws://{}/{}", self.account, self.region)
    }
}
