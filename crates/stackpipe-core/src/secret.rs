//! References to values held in an external secret store.

use serde::{Deserialize, Serialize};

/// Points at a secret (optionally a single JSON field of it) without holding its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretReference {
    /// Secret name or ARN.
    pub secret_id: String,
    /// JSON field to extract from the secret string.
    pub json_field: Option<String>,
}

impl SecretReference {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            json_field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.json_field = Some(field.into());
        self
    }

    /// Render as a deploy-time dynamic reference so the value never lands in the template.
    pub fn to_dynamic_reference(&self) -> String {
        format!(
            "{{{{resolve:secretsmanager:{}:SecretString:{}::}}}}",
            self.secret_id,
            self.json_field.as_deref().unwrap_or("")
        )
    }
}
