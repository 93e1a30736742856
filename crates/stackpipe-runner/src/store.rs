//! Parameter store backends for local builds.

use async_trait::async_trait;
use stackpipe_core::parameter::{NamedParameter, ParameterStore};
use stackpipe_core::{Error, Result};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

/// Reads parameters through `aws ssm get-parameter`, the same unmasked path
/// the hosted build uses.
pub struct AwsCliParameterStore {
    /// Path to the aws binary
    aws_bin: String,
}

impl Default for AwsCliParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCliParameterStore {
    pub fn new() -> Self {
        let aws_bin = std::env::var("AWS_CLI_BIN").unwrap_or_else(|_| "aws".to_string());
        Self { aws_bin }
    }

    pub fn with_binary(aws_bin: impl Into<String>) -> Self {
        Self {
            aws_bin: aws_bin.into(),
        }
    }
}

#[async_trait]
impl ParameterStore for AwsCliParameterStore {
    async fn get(&self, path: &str) -> Result<String> {
        debug!(path = %path, "Fetching parameter");

        let output = Command::new(&self.aws_bin)
            .args([
                "ssm",
                "get-parameter",
                "--name",
                path,
                "--query",
                "Parameter.Value",
                "--output",
                "text",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::ParameterLookup {
                name: path.to_string(),
                message: format!("failed to run {}: {}", self.aws_bin, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(path = %path, stderr = %stderr, "Parameter lookup failed");
            return Err(Error::ParameterLookup {
                name: path.to_string(),
                message: stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// In-memory parameters, e.g. the values synthesis would publish.
#[derive(Debug, Clone, Default)]
pub struct StaticParameterStore {
    values: HashMap<String, String>,
}

impl StaticParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(path.into(), value.into());
        self
    }
}

impl From<&[NamedParameter]> for StaticParameterStore {
    fn from(parameters: &[NamedParameter]) -> Self {
        Self {
            values: parameters
                .iter()
                .map(|p| (p.path.clone(), p.value.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ParameterStore for StaticParameterStore {
    async fn get(&self, path: &str) -> Result<String> {
        self.values
            .get(path)
            .cloned()
            .ok_or_else(|| Error::ParameterLookup {
                name: path.to_string(),
                message: "parameter not found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_store() {
        let store = StaticParameterStore::new().with("/development/orders/environment", "development");
        assert_eq!(
            store.get("/development/orders/environment").await.unwrap(),
            "development"
        );
        assert!(matches!(
            store.get("/development/orders/missing").await,
            Err(Error::ParameterLookup { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let store = AwsCliParameterStore::with_binary("/nonexistent/stackpipe-aws");
        assert!(store.get("/x/y/z").await.is_err());
    }
}
