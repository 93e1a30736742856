//! Stack operation types.

use serde::{Deserialize, Serialize};

/// Capability acknowledgements passed to stack operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackCapability {
    /// Templates may contain macros that expand on deploy.
    AutoExpand,
    /// IAM resources with custom names.
    NamedIam,
    /// IAM resources without custom names.
    AnonymousIam,
}

impl StackCapability {
    /// The elevated set used by both deploy and destroy.
    pub const ELEVATED: [StackCapability; 3] = [
        StackCapability::AutoExpand,
        StackCapability::NamedIam,
        StackCapability::AnonymousIam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StackCapability::AutoExpand => "CAPABILITY_AUTO_EXPAND",
            StackCapability::NamedIam => "CAPABILITY_NAMED_IAM",
            StackCapability::AnonymousIam => "CAPABILITY_IAM",
        }
    }

    /// Comma-separated form expected by the pipeline action configuration.
    pub fn join(capabilities: &[StackCapability]) -> String {
        capabilities
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for StackCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stack action does to its target stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackActionMode {
    CreateUpdate,
    DeleteOnly,
}

impl std::fmt::Display for StackActionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackActionMode::CreateUpdate => write!(f, "CREATE_UPDATE"),
            StackActionMode::DeleteOnly => write!(f, "DELETE_ONLY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_elevated() {
        assert_eq!(
            StackCapability::join(&StackCapability::ELEVATED),
            "CAPABILITY_AUTO_EXPAND,CAPABILITY_NAMED_IAM,CAPABILITY_IAM"
        );
    }
}
