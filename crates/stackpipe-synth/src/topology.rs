//! Pipeline topology: Source, Build, Deploy and a disabled-by-default Destroy.

use serde::{Deserialize, Serialize};
use stackpipe_config::Settings;
use stackpipe_core::DeploymentConfig;
use stackpipe_core::artifact::{Artifact, MODIFIED_ARTIFACT, SOURCE_ARTIFACT};
use stackpipe_core::build::{BuildPlan, CONFIGURATION_OUTPUT, TEMPLATE_OUTPUT};
use stackpipe_core::parameter::NamedParameter;
use stackpipe_core::pipeline::{Action, ActionKind, Pipeline, Stage, StageKind, Transition};
use stackpipe_core::role::RolePlan;
use stackpipe_core::stack::StackCapability;
use stackpipe_core::{Error, Result};
use tracing::info;

pub const BUILD_PROJECT_ID: &str = "BuildProject";

pub const DESTROY_DISABLED_REASON: &str =
    "Disabled by default, because it should only be triggered for Stack deletion!";
pub const DESTROY_APPROVAL_INFO: &str =
    "DESTROY CLOUDFORMATION RESOURCES (WARNING, ONLY FOR CLEANING UP INFRASTRUCTURE)!";

/// Hosted build project running the typed build plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildProject {
    pub logical_id: String,
    pub name: String,
    pub description: String,
    /// Logical id of the role the project runs as.
    pub role: String,
    pub image: String,
    pub compute_type: String,
    pub plan: BuildPlan,
}

/// Declare the build project from the published parameters.
pub fn declare_build_project(
    config: &DeploymentConfig,
    settings: &Settings,
    parameters: &[NamedParameter],
    roles: &RolePlan,
) -> Result<BuildProject> {
    let [resource_name, environment] = parameters else {
        return Err(Error::InvalidInput(format!(
            "build project expects 2 published parameters, got {}",
            parameters.len()
        )));
    };

    let plan = BuildPlan::standard(&resource_name.path, &environment.path);
    plan.validate()?;

    Ok(BuildProject {
        logical_id: BUILD_PROJECT_ID.to_string(),
        name: config.prefixed("project"),
        description: format!(
            "Build project for {} solution in {} environment",
            config.resource_name(),
            config.environment()
        ),
        role: roles.role_for(StageKind::Build).logical_id.clone(),
        image: settings.build.image.clone(),
        compute_type: settings.build.compute_type.clone(),
        plan,
    })
}

/// Declare the four ordered stages and validate the result.
pub fn declare_pipeline(
    config: &DeploymentConfig,
    settings: &Settings,
    roles: &RolePlan,
    project: &BuildProject,
) -> Result<Pipeline> {
    let source_artifact = Artifact::new(SOURCE_ARTIFACT);
    let modified_artifact = Artifact::new(MODIFIED_ARTIFACT);
    let main_stack = config.main_stack_name();
    let role_id = |stage: StageKind| roles.role_for(stage).logical_id.clone();

    let source = Stage::new(StageKind::Source).with_action(Action::new(
        "Source",
        ActionKind::GitHubSource {
            owner: settings.source.owner.clone(),
            repo: settings.source.repo.clone(),
            branch: settings.source.branch.clone(),
            oauth_token: settings.secret.clone(),
            output: source_artifact.clone(),
        },
    ));

    let build = Stage::new(StageKind::Build).with_action(
        Action::new(
            "Build",
            ActionKind::CodeBuild {
                project: project.logical_id.clone(),
                input: source_artifact,
                outputs: vec![modified_artifact.clone()],
            },
        )
        .with_role(role_id(StageKind::Build)),
    );

    let deploy = Stage::new(StageKind::Deploy).with_action(
        Action::new(
            "Deploy",
            ActionKind::CreateUpdateStack {
                stack_name: main_stack.clone(),
                capabilities: StackCapability::ELEVATED.to_vec(),
                template: modified_artifact.at_path(TEMPLATE_OUTPUT),
                configuration: modified_artifact.at_path(CONFIGURATION_OUTPUT),
                deployment_role: role_id(StageKind::Deploy),
            },
        )
        .with_role(role_id(StageKind::Deploy)),
    );

    let destroy = Stage::new(StageKind::Destroy)
        .with_transition(Transition::Disabled {
            reason: DESTROY_DISABLED_REASON.to_string(),
        })
        .with_action(
            Action::new(
                "DestroyInfrastructure",
                ActionKind::ManualApproval {
                    additional_information: DESTROY_APPROVAL_INFO.to_string(),
                },
            )
            .with_run_order(1),
        )
        .with_action(
            Action::new(
                "Destroy",
                ActionKind::DeleteStack {
                    stack_name: main_stack,
                    capabilities: StackCapability::ELEVATED.to_vec(),
                    deployment_role: role_id(StageKind::Destroy),
                },
            )
            .with_role(role_id(StageKind::Destroy))
            .with_run_order(2),
        );

    let pipeline = Pipeline {
        name: config.prefixed("pipeline"),
        role: roles.pipeline_role().logical_id.clone(),
        stages: vec![source, build, deploy, destroy],
    };
    pipeline.validate()?;

    info!(
        pipeline = %pipeline.name,
        stages = pipeline.stages.len(),
        "Declared pipeline topology"
    );
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::publish_parameters;
    use crate::roles::role_plan;
    use stackpipe_core::build::BuildStep;
    use stackpipe_core::{AccountId, DeploymentEnvironment, ResourceName};

    fn config() -> DeploymentConfig {
        DeploymentConfig::new(
            DeploymentEnvironment::Production,
            ResourceName::new("orders").unwrap(),
            AccountId::new("123456789012").unwrap(),
            "us-east-1",
        )
    }

    fn declare_all(settings: &Settings) -> (BuildProject, Pipeline) {
        let cfg = config();
        let roles = role_plan(&cfg, settings);
        let params = publish_parameters(&cfg).unwrap();
        let project = declare_build_project(&cfg, settings, &params, &roles).unwrap();
        let pipeline = declare_pipeline(&cfg, settings, &roles, &project).unwrap();
        (project, pipeline)
    }

    #[test]
    fn test_stage_order_and_names() {
        let (_, pipeline) = declare_all(&Settings::default());
        let names: Vec<&str> = pipeline.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["SourceStage", "BuildStage", "DeployStage", "DestroyStage"]);
        assert_eq!(pipeline.name, "production-orders-pipeline");
    }

    #[test]
    fn test_destroy_stage_gated() {
        let (_, pipeline) = declare_all(&Settings::default());
        let destroy = pipeline.stage(StageKind::Destroy).unwrap();

        assert_eq!(
            destroy.transition,
            Transition::Disabled {
                reason: DESTROY_DISABLED_REASON.to_string()
            }
        );
        let ordered = destroy.ordered_actions();
        assert!(matches!(ordered[0].kind, ActionKind::ManualApproval { .. }));
        assert_eq!(ordered[0].run_order, 1);
        assert!(matches!(ordered[1].kind, ActionKind::DeleteStack { .. }));
        assert_eq!(ordered[1].run_order, 2);
    }

    #[test]
    fn test_other_transitions_enabled() {
        let (_, pipeline) = declare_all(&Settings::default());
        for kind in [StageKind::Source, StageKind::Build, StageKind::Deploy] {
            assert!(pipeline.stage(kind).unwrap().transition.is_enabled());
        }
    }

    #[test]
    fn test_artifact_hand_off() {
        let (_, pipeline) = declare_all(&Settings::default());
        let deploy = &pipeline.stage(StageKind::Deploy).unwrap().actions[0];
        match &deploy.kind {
            ActionKind::CreateUpdateStack {
                stack_name,
                template,
                configuration,
                capabilities,
                ..
            } => {
                assert_eq!(stack_name, "orders-main-stack-production");
                assert_eq!(template.to_string(), "ModifiedArtifact::artifacts/cloudformation.yml");
                assert_eq!(
                    configuration.to_string(),
                    "ModifiedArtifact::artifacts/configuration.json"
                );
                assert_eq!(capabilities.len(), 3);
            }
            other => panic!("unexpected deploy action {:?}", other),
        }
    }

    #[test]
    fn test_every_action_shares_the_role_by_default() {
        let (project, pipeline) = declare_all(&Settings::default());
        assert_eq!(project.role, "PipelineRole");
        assert_eq!(pipeline.role, "PipelineRole");
        for stage in &pipeline.stages {
            for action in &stage.actions {
                if let Some(role) = &action.role {
                    assert_eq!(role, "PipelineRole");
                }
            }
        }
    }

    #[test]
    fn test_stage_role_override_reaches_actions() {
        let mut settings = Settings::default();
        settings.stage_policies.insert(
            StageKind::Deploy,
            vec!["arn:aws:iam::aws:policy/PowerUserAccess".to_string()],
        );
        let (project, pipeline) = declare_all(&settings);

        assert_eq!(project.role, "PipelineRole");
        let deploy = &pipeline.stage(StageKind::Deploy).unwrap().actions[0];
        assert_eq!(deploy.role.as_deref(), Some("DeployStageRole"));
        assert_eq!(pipeline.role, "PipelineRole");
    }

    #[test]
    fn test_build_plan_reads_published_parameters() {
        let (project, _) = declare_all(&Settings::default());
        let fetched: Vec<&str> = project
            .plan
            .steps
            .iter()
            .filter_map(|s| match s {
                BuildStep::FetchParameter { parameter, .. } => Some(parameter.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            fetched,
            vec![
                "/production/orders/main_resources_name",
                "/production/orders/environment"
            ]
        );
        assert_eq!(project.name, "production-orders-project");
    }

    #[test]
    fn test_project_requires_two_parameters() {
        let cfg = config();
        let settings = Settings::default();
        let roles = role_plan(&cfg, &settings);
        let result = declare_build_project(&cfg, &settings, &[], &roles);
        assert!(result.is_err());
    }
}
