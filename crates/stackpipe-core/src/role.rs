//! Access roles assumed by the pipeline, build and stack services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::DeploymentConfig;
use crate::pipeline::StageKind;

/// Broad administrative managed policy attached by default.
pub const ADMINISTRATOR_ACCESS: &str = "arn:aws:iam::aws:policy/AdministratorAccess";

/// Logical id of the shared pipeline role.
pub const SHARED_ROLE_ID: &str = "PipelineRole";

/// Service principals allowed to assume the pipeline roles.
pub const SERVICE_PRINCIPALS: [&str; 3] = [
    "codepipeline.amazonaws.com",
    "codebuild.amazonaws.com",
    "cloudformation.amazonaws.com",
];

/// An identity assumable by the orchestration, build and stack-management services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRole {
    /// Logical id inside the synthesized template.
    pub logical_id: String,
    /// Physical role name.
    pub role_name: String,
    pub principals: Vec<String>,
    /// Logical ids of roles allowed to assume this one.
    #[serde(default)]
    pub trusted_roles: Vec<String>,
    pub managed_policies: Vec<String>,
    pub description: String,
}

impl AccessRole {
    /// The shared role used by every stage unless overridden.
    pub fn shared(config: &DeploymentConfig, managed_policies: Vec<String>) -> Self {
        Self {
            logical_id: SHARED_ROLE_ID.to_string(),
            role_name: config.prefixed("role"),
            principals: SERVICE_PRINCIPALS.iter().map(|p| p.to_string()).collect(),
            trusted_roles: Vec::new(),
            managed_policies,
            description: format!(
                "Role for codepipeline deployment for {} solution in {} environment",
                config.resource_name(),
                config.environment()
            ),
        }
    }

    /// A role dedicated to one stage. CodePipeline assumes action roles
    /// with its service role, so the shared role is trusted as well.
    pub fn for_stage(
        config: &DeploymentConfig,
        stage: StageKind,
        managed_policies: Vec<String>,
    ) -> Self {
        Self {
            logical_id: format!("{}Role", stage.stage_name()),
            role_name: config.prefixed(&format!("{}-role", stage.as_str())),
            principals: SERVICE_PRINCIPALS.iter().map(|p| p.to_string()).collect(),
            trusted_roles: vec![SHARED_ROLE_ID.to_string()],
            managed_policies,
            description: format!(
                "Role for the {} stage of {} solution in {} environment",
                stage.as_str(),
                config.resource_name(),
                config.environment()
            ),
        }
    }
}

/// Which role each stage runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePlan {
    shared: AccessRole,
    overrides: BTreeMap<StageKind, AccessRole>,
}

impl RolePlan {
    /// Every stage uses `shared`.
    pub fn shared(shared: AccessRole) -> Self {
        Self {
            shared,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, stage: StageKind, role: AccessRole) -> Self {
        self.overrides.insert(stage, role);
        self
    }

    /// Role for pipeline-level operations.
    pub fn pipeline_role(&self) -> &AccessRole {
        &self.shared
    }

    pub fn role_for(&self, stage: StageKind) -> &AccessRole {
        self.overrides.get(&stage).unwrap_or(&self.shared)
    }

    /// Every distinct role, shared first.
    pub fn roles(&self) -> Vec<&AccessRole> {
        std::iter::once(&self.shared)
            .chain(self.overrides.values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountId, DeploymentEnvironment, ResourceName};

    fn config() -> DeploymentConfig {
        DeploymentConfig::new(
            DeploymentEnvironment::Production,
            ResourceName::new("orders").unwrap(),
            AccountId::new("123456789012").unwrap(),
            "us-east-1",
        )
    }

    #[test]
    fn test_shared_plan_uses_one_role() {
        let cfg = config();
        let plan = RolePlan::shared(AccessRole::shared(
            &cfg,
            vec![ADMINISTRATOR_ACCESS.to_string()],
        ));

        assert_eq!(plan.roles().len(), 1);
        for stage in StageKind::ALL {
            assert_eq!(plan.role_for(stage).role_name, "production-orders-role");
        }
        assert_eq!(plan.pipeline_role().principals.len(), 3);
    }

    #[test]
    fn test_override_only_affects_its_stage() {
        let cfg = config();
        let deploy = AccessRole::for_stage(
            &cfg,
            StageKind::Deploy,
            vec!["arn:aws:iam::aws:policy/PowerUserAccess".to_string()],
        );
        let plan = RolePlan::shared(AccessRole::shared(
            &cfg,
            vec![ADMINISTRATOR_ACCESS.to_string()],
        ))
        .with_override(StageKind::Deploy, deploy);

        assert_eq!(plan.roles().len(), 2);
        assert_eq!(
            plan.role_for(StageKind::Deploy).role_name,
            "production-orders-deploy-role"
        );
        assert_eq!(plan.role_for(StageKind::Deploy).logical_id, "DeployStageRole");
        assert_eq!(plan.role_for(StageKind::Deploy).trusted_roles, vec![SHARED_ROLE_ID]);
        assert_eq!(plan.role_for(StageKind::Build).logical_id, "PipelineRole");
        assert!(plan.pipeline_role().trusted_roles.is_empty());
    }
}
