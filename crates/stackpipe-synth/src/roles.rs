//! Access role definition.
//!
//! Parity default: one administrative role shared by every stage. Stages
//! listed in the settings get a dedicated role with their own policies.

use stackpipe_config::Settings;
use stackpipe_core::DeploymentConfig;
use stackpipe_core::role::{AccessRole, RolePlan};
use tracing::{info, warn};

pub fn role_plan(config: &DeploymentConfig, settings: &Settings) -> RolePlan {
    let shared = AccessRole::shared(config, settings.shared_policies.clone());
    if settings.stage_policies.is_empty() {
        warn!(
            role = %shared.role_name,
            "Every stage shares one role; declare per-stage roles to narrow permissions"
        );
    }

    settings
        .stage_policies
        .iter()
        .fold(RolePlan::shared(shared), |plan, (stage, policies)| {
            if !stage.has_action_role() {
                warn!(stage = %stage, "Stage runs under the pipeline role; ignoring its role");
                return plan;
            }
            info!(stage = %stage, "Declaring dedicated stage role");
            plan.with_override(*stage, AccessRole::for_stage(config, *stage, policies.clone()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpipe_core::pipeline::StageKind;
    use stackpipe_core::role::ADMINISTRATOR_ACCESS;
    use stackpipe_core::{AccountId, DeploymentEnvironment, ResourceName};

    fn config() -> DeploymentConfig {
        DeploymentConfig::new(
            DeploymentEnvironment::Development,
            ResourceName::new("orders").unwrap(),
            AccountId::new("123456789012").unwrap(),
            "us-east-1",
        )
    }

    #[test]
    fn test_default_plan_is_shared_admin() {
        let plan = role_plan(&config(), &Settings::default());
        assert_eq!(plan.roles().len(), 1);
        let role = plan.pipeline_role();
        assert_eq!(role.role_name, "development-orders-role");
        assert_eq!(role.managed_policies, vec![ADMINISTRATOR_ACCESS]);
        assert_eq!(
            role.principals,
            vec![
                "codepipeline.amazonaws.com",
                "codebuild.amazonaws.com",
                "cloudformation.amazonaws.com"
            ]
        );
    }

    #[test]
    fn test_stage_override() {
        let mut settings = Settings::default();
        settings.stage_policies.insert(
            StageKind::Build,
            vec!["arn:aws:iam::aws:policy/AWSCodeBuildDeveloperAccess".to_string()],
        );

        let plan = role_plan(&config(), &settings);
        assert_eq!(plan.roles().len(), 2);
        assert_eq!(
            plan.role_for(StageKind::Build).role_name,
            "development-orders-build-role"
        );
        assert_eq!(plan.role_for(StageKind::Deploy).logical_id, "PipelineRole");
    }

    #[test]
    fn test_source_override_ignored() {
        let mut settings = Settings::default();
        settings.stage_policies.insert(
            StageKind::Source,
            vec!["arn:aws:iam::aws:policy/ReadOnlyAccess".to_string()],
        );

        let plan = role_plan(&config(), &settings);
        assert_eq!(plan.roles().len(), 1);
        assert_eq!(plan.role_for(StageKind::Source).logical_id, "PipelineRole");
    }
}
