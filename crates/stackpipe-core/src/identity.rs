//! Caller identity lookup abstraction.

use serde::{Deserialize, Serialize};

use crate::Result;

/// The identity the process is currently running as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub user_id: String,
    pub account: String,
    pub arn: String,
}

/// Resolves the current caller identity.
///
/// Lookups are blocking and never retried; a failure is fatal to synthesis.
pub trait IdentityProvider {
    fn caller_identity(&self) -> Result<CallerIdentity>;
}
