//! Caller identity lookup through the AWS CLI.

use stackpipe_core::identity::{CallerIdentity, IdentityProvider};
use stackpipe_core::{Error, Result};
use std::process::Command;
use tracing::{debug, error};

/// Runs `aws sts get-caller-identity` synchronously, without retries.
pub struct AwsCliIdentityProvider {
    /// Path to the aws binary
    aws_bin: String,
}

impl Default for AwsCliIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCliIdentityProvider {
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

impl IdentityProvider for AwsCliIdentityProvider {
    fn caller_identity(&self) -> Result<CallerIdentity> {
        debug!(bin = %self.aws_bin, "Looking up caller identity");

        let output = Command::new(&self.aws_bin)
            .args(["sts", "get-caller-identity", "--output", "json"])
            .output()
            .map_err(|e| Error::IdentityLookup(format!("failed to run {}: {}", self.aws_bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(status = %output.status, stderr = %stderr, "Caller identity lookup failed");
            return Err(Error::IdentityLookup(format!(
                "{} exited with {}: {}",
                self.aws_bin, output.status, stderr
            )));
        }

        parse_caller_identity(&output.stdout)
    }
}

/// Parse the structured lookup response; anything malformed is an error.
pub fn parse_caller_identity(raw: &[u8]) -> Result<CallerIdentity> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::IdentityLookup(format!("response is not UTF-8: {}", e)))?;
    let identity: CallerIdentity = serde_json::from_str(text)
        .map_err(|e| Error::IdentityLookup(format!("malformed response: {}", e)))?;
    if identity.arn.trim().is_empty() {
        return Err(Error::IdentityLookup("response has an empty Arn".to_string()));
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let raw = br#"{"UserId": "AROAEXAMPLE:session", "Account": "123456789012", "Arn": "arn:aws:sts::123456789012:assumed-role/deployer/session"}"#;
        let identity = parse_caller_identity(raw).unwrap();
        assert_eq!(
            identity.arn,
            "arn:aws:sts::123456789012:assumed-role/deployer/session"
        );
    }

    #[test]
    fn test_parse_malformed_response() {
        assert!(matches!(
            parse_caller_identity(b"not json"),
            Err(Error::IdentityLookup(_))
        ));
        assert!(matches!(
            parse_caller_identity(br#"{"UserId": "x", "Account": "1"}"#),
            Err(Error::IdentityLookup(_))
        ));
        assert!(matches!(
            parse_caller_identity(br#"{"UserId": "x", "Account": "1", "Arn": " "}"#),
            Err(Error::IdentityLookup(_))
        ));
        assert!(parse_caller_identity(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let provider = AwsCliIdentityProvider::with_binary("/nonexistent/stackpipe-aws");
        assert!(matches!(
            provider.caller_identity(),
            Err(Error::IdentityLookup(_))
        ));
    }
}
