//! CloudFormation template rendering.

use serde_json::{Map, Value, json};
use stackpipe_core::DeploymentConfig;
use stackpipe_core::parameter::NamedParameter;
use stackpipe_core::pipeline::{Action, ActionKind, Pipeline, Transition};
use stackpipe_core::role::{AccessRole, RolePlan};
use stackpipe_core::stack::StackCapability;
use stackpipe_core::tags::TagSet;

use crate::SynthResult;
use crate::publisher;
use crate::topology::BuildProject;

pub const PIPELINE_ID: &str = "Pipeline";
pub const ARTIFACTS_BUCKET_ID: &str = "ArtifactsBucket";
pub const WEBHOOK_ID: &str = "PipelineSourceWebhook";

/// Render the whole deployment unit as a template document.
pub fn render(
    config: &DeploymentConfig,
    parameters: &[NamedParameter],
    roles: &RolePlan,
    project: &BuildProject,
    pipeline: &Pipeline,
) -> SynthResult<Value> {
    let mut resources = Map::new();

    for parameter in parameters {
        resources.insert(publisher::logical_id(parameter), render_parameter(parameter));
    }
    for role in roles.roles() {
        resources.insert(role.logical_id.clone(), render_role(role));
    }
    resources.insert(ARTIFACTS_BUCKET_ID.to_string(), render_bucket());
    resources.insert(project.logical_id.clone(), render_project(project)?);
    resources.insert(PIPELINE_ID.to_string(), render_pipeline(pipeline, roles));
    if let Some(webhook) = render_webhook(pipeline) {
        resources.insert(WEBHOOK_ID.to_string(), webhook);
    }

    Ok(json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Description": config.description(),
        "Resources": resources,
        "Outputs": {
            "PipelineName": { "Value": { "Ref": PIPELINE_ID } },
            "ArtifactsBucketName": { "Value": { "Ref": ARTIFACTS_BUCKET_ID } },
        }
    }))
}

/// Stamp `tags` onto every taggable resource of `template`.
pub fn apply_tags(template: &mut Value, tags: &TagSet) {
    let Some(resources) = template
        .get_mut("Resources")
        .and_then(|r| r.as_object_mut())
    else {
        return;
    };

    for resource in resources.values_mut() {
        let rendered = match resource.get("Type").and_then(|t| t.as_str()) {
            Some("AWS::SSM::Parameter") => tags.to_map(),
            Some(
                "AWS::IAM::Role"
                | "AWS::S3::Bucket"
                | "AWS::CodeBuild::Project"
                | "AWS::CodePipeline::Pipeline",
            ) => tags.to_list(),
            _ => continue,
        };
        if let Some(properties) = resource
            .get_mut("Properties")
            .and_then(|p| p.as_object_mut())
        {
            properties.insert("Tags".to_string(), rendered);
        }
    }
}

fn arn_of(logical_id: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, "Arn"] })
}

fn render_parameter(parameter: &NamedParameter) -> Value {
    json!({
        "Type": "AWS::SSM::Parameter",
        "Properties": {
            "Type": "String",
            "Name": parameter.path,
            "Value": parameter.value,
            "Description": parameter.description,
        }
    })
}

fn render_role(role: &AccessRole) -> Value {
    let mut principal = json!({ "Service": role.principals });
    if !role.trusted_roles.is_empty() {
        let trusted: Vec<Value> = role.trusted_roles.iter().map(|id| arn_of(id)).collect();
        principal["AWS"] = json!(trusted);
    }
    json!({
        "Type": "AWS::IAM::Role",
        "Properties": {
            "RoleName": role.role_name,
            "Description": role.description,
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": principal,
                    "Action": "sts:AssumeRole",
                }]
            },
            "ManagedPolicyArns": role.managed_policies,
        }
    })
}

fn render_bucket() -> Value {
    json!({
        "Type": "AWS::S3::Bucket",
        "DeletionPolicy": "Retain",
        "UpdateReplacePolicy": "Retain",
        "Properties": {
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                }]
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            }
        }
    })
}

fn render_project(project: &BuildProject) -> SynthResult<Value> {
    let buildspec = serde_json::to_string_pretty(&project.plan.to_buildspec())?;
    Ok(json!({
        "Type": "AWS::CodeBuild::Project",
        "Properties": {
            "Name": project.name,
            "Description": project.description,
            "ServiceRole": arn_of(&project.role),
            "Source": { "Type": "CODEPIPELINE", "BuildSpec": buildspec },
            "Artifacts": { "Type": "CODEPIPELINE" },
            "Environment": {
                "Type": "LINUX_CONTAINER",
                "ComputeType": project.compute_type,
                "Image": project.image,
                "PrivilegedMode": false,
            }
        }
    }))
}

fn render_pipeline(pipeline: &Pipeline, roles: &RolePlan) -> Value {
    let stages: Vec<Value> = pipeline
        .stages
        .iter()
        .map(|stage| {
            let actions: Vec<Value> = stage
                .ordered_actions()
                .into_iter()
                .map(render_action)
                .collect();
            json!({ "Name": stage.name, "Actions": actions })
        })
        .collect();

    let disabled: Vec<Value> = pipeline
        .stages
        .iter()
        .filter_map(|stage| match &stage.transition {
            Transition::Disabled { reason } => Some(json!({
                "StageName": stage.name,
                "Reason": reason,
            })),
            Transition::Enabled => None,
        })
        .collect();

    let depends_on: Vec<&str> = roles
        .roles()
        .into_iter()
        .map(|r| r.logical_id.as_str())
        .collect();

    json!({
        "Type": "AWS::CodePipeline::Pipeline",
        "DependsOn": depends_on,
        "Properties": {
            "Name": pipeline.name,
            "RoleArn": arn_of(&pipeline.role),
            "ArtifactStore": {
                "Type": "S3",
                "Location": { "Ref": ARTIFACTS_BUCKET_ID },
            },
            "Stages": stages,
            "DisableInboundStageTransitions": disabled,
            "RestartExecutionOnUpdate": false,
        }
    })
}

fn render_action(action: &Action) -> Value {
    let (category, owner, provider, configuration) = match &action.kind {
        ActionKind::GitHubSource {
            owner,
            repo,
            branch,
            oauth_token,
            ..
        } => (
            "Source",
            "ThirdParty",
            "GitHub",
            json!({
                "Owner": owner,
                "Repo": repo,
                "Branch": branch,
                "OAuthToken": oauth_token.to_dynamic_reference(),
                "PollForSourceChanges": false,
            }),
        ),
        ActionKind::CodeBuild { project, .. } => (
            "Build",
            "AWS",
            "CodeBuild",
            json!({ "ProjectName": { "Ref": project } }),
        ),
        ActionKind::CreateUpdateStack {
            stack_name,
            capabilities,
            template,
            configuration,
            deployment_role,
        } => (
            "Deploy",
            "AWS",
            "CloudFormation",
            json!({
                "ActionMode": action.kind.stack_mode().map(|m| m.to_string()),
                "StackName": stack_name,
                "Capabilities": StackCapability::join(capabilities),
                "RoleArn": arn_of(deployment_role),
                "TemplatePath": template.to_string(),
                "TemplateConfiguration": configuration.to_string(),
            }),
        ),
        ActionKind::ManualApproval {
            additional_information,
        } => (
            "Approval",
            "AWS",
            "Manual",
            json!({ "CustomData": additional_information }),
        ),
        ActionKind::DeleteStack {
            stack_name,
            capabilities,
            deployment_role,
        } => (
            "Deploy",
            "AWS",
            "CloudFormation",
            json!({
                "ActionMode": action.kind.stack_mode().map(|m| m.to_string()),
                "StackName": stack_name,
                "Capabilities": StackCapability::join(capabilities),
                "RoleArn": arn_of(deployment_role),
            }),
        ),
    };

    let artifacts = |list: Vec<&stackpipe_core::artifact::Artifact>| -> Vec<Value> {
        list.into_iter().map(|a| json!({ "Name": a.name })).collect()
    };

    let mut rendered = json!({
        "Name": action.name,
        "ActionTypeId": {
            "Category": category,
            "Owner": owner,
            "Provider": provider,
            "Version": "1",
        },
        "Configuration": configuration,
        "InputArtifacts": artifacts(action.kind.inputs()),
        "OutputArtifacts": artifacts(action.kind.outputs()),
        "RunOrder": action.run_order,
    });
    if let (Some(role), Some(obj)) = (&action.role, rendered.as_object_mut()) {
        obj.insert("RoleArn".to_string(), arn_of(role));
    }
    rendered
}

/// Push webhook for the GitHub source action, if any.
fn render_webhook(pipeline: &Pipeline) -> Option<Value> {
    pipeline
        .stages
        .iter()
        .flat_map(|s| s.actions.iter())
        .find_map(|action| match &action.kind {
            ActionKind::GitHubSource {
                branch,
                oauth_token,
                ..
            } => Some(json!({
                "Type": "AWS::CodePipeline::Webhook",
                "Properties": {
                    "Authentication": "GITHUB_HMAC",
                    "AuthenticationConfiguration": {
                        "SecretToken": oauth_token.to_dynamic_reference(),
                    },
                    "Filters": [{
                        "JsonPath": "$.ref",
                        "MatchEquals": format!("refs/heads/{}", branch),
                    }],
                    "TargetAction": action.name,
                    "TargetPipeline": { "Ref": PIPELINE_ID },
                    "TargetPipelineVersion": 1,
                    "RegisterWithThirdParty": true,
                }
            })),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::publish_parameters;
    use crate::roles::role_plan;
    use crate::topology::{declare_build_project, declare_pipeline};
    use stackpipe_config::Settings;
    use stackpipe_core::pipeline::StageKind;
    use stackpipe_core::{AccountId, DeploymentEnvironment, ResourceName};

    fn rendered(settings: &Settings) -> Value {
        let cfg = DeploymentConfig::new(
            DeploymentEnvironment::Development,
            ResourceName::new("orders").unwrap(),
            AccountId::new("123456789012").unwrap(),
            "us-east-1",
        );
        let roles = role_plan(&cfg, settings);
        let params = publish_parameters(&cfg).unwrap();
        let project = declare_build_project(&cfg, settings, &params, &roles).unwrap();
        let pipeline = declare_pipeline(&cfg, settings, &roles, &project).unwrap();
        render(&cfg, &params, &roles, &project, &pipeline).unwrap()
    }

    #[test]
    fn test_resources_present() {
        let template = rendered(&Settings::default());
        let resources = template["Resources"].as_object().unwrap();

        assert_eq!(resources["PipelineRole"]["Type"], "AWS::IAM::Role");
        assert_eq!(resources["MainResourcesNameParameter"]["Type"], "AWS::SSM::Parameter");
        assert_eq!(
            resources["EnvironmentParameter"]["Properties"]["Name"],
            "/development/orders/environment"
        );
        assert_eq!(resources["BuildProject"]["Type"], "AWS::CodeBuild::Project");
        assert_eq!(resources["Pipeline"]["Type"], "AWS::CodePipeline::Pipeline");
        assert_eq!(resources["PipelineSourceWebhook"]["Type"], "AWS::CodePipeline::Webhook");
        assert_eq!(resources.len(), 7);
        assert_eq!(
            template["Description"],
            "CI/CD stack for orders solution in development environment"
        );
    }

    #[test]
    fn test_destroy_transition_disabled_in_template() {
        let template = rendered(&Settings::default());
        let props = &template["Resources"]["Pipeline"]["Properties"];
        let disabled = props["DisableInboundStageTransitions"].as_array().unwrap();

        assert_eq!(disabled.len(), 1);
        assert_eq!(disabled[0]["StageName"], "DestroyStage");

        let destroy = &props["Stages"][3];
        assert_eq!(destroy["Actions"][0]["ActionTypeId"]["Provider"], "Manual");
        assert_eq!(destroy["Actions"][0]["RunOrder"], 1);
        assert_eq!(destroy["Actions"][1]["Configuration"]["ActionMode"], "DELETE_ONLY");
        assert_eq!(destroy["Actions"][1]["RunOrder"], 2);
    }

    #[test]
    fn test_deploy_action_configuration() {
        let template = rendered(&Settings::default());
        let deploy = &template["Resources"]["Pipeline"]["Properties"]["Stages"][2]["Actions"][0];
        let config = &deploy["Configuration"];

        assert_eq!(config["ActionMode"], "CREATE_UPDATE");
        assert_eq!(config["StackName"], "orders-main-stack-development");
        assert_eq!(
            config["Capabilities"],
            "CAPABILITY_AUTO_EXPAND,CAPABILITY_NAMED_IAM,CAPABILITY_IAM"
        );
        assert_eq!(config["TemplatePath"], "ModifiedArtifact::artifacts/cloudformation.yml");
        assert_eq!(deploy["InputArtifacts"][0]["Name"], "ModifiedArtifact");
        assert_eq!(config["RoleArn"]["Fn::GetAtt"][0], "PipelineRole");
    }

    #[test]
    fn test_source_token_is_dynamic_reference() {
        let template = rendered(&Settings::default());
        let source = &template["Resources"]["Pipeline"]["Properties"]["Stages"][0]["Actions"][0];
        assert_eq!(
            source["Configuration"]["OAuthToken"],
            "{{resolve:secretsmanager:my-github-token:SecretString:token::}}"
        );
        assert_eq!(source["OutputArtifacts"][0]["Name"], "SourceArtifact");
        assert!(source.get("RoleArn").is_none());
    }

    #[test]
    fn test_buildspec_embedded() {
        let template = rendered(&Settings::default());
        let raw = template["Resources"]["BuildProject"]["Properties"]["Source"]["BuildSpec"]
            .as_str()
            .unwrap();
        let spec: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(spec["version"], "0.2");
        assert_eq!(spec["artifacts"]["files"][0], "artifacts/*");
    }

    #[test]
    fn test_stage_role_rendered() {
        let mut settings = Settings::default();
        settings.stage_policies.insert(
            StageKind::Destroy,
            vec!["arn:aws:iam::aws:policy/PowerUserAccess".to_string()],
        );
        let template = rendered(&settings);

        let role = &template["Resources"]["DestroyStageRole"];
        assert_eq!(role["Properties"]["RoleName"], "development-orders-destroy-role");
        let delete = &template["Resources"]["Pipeline"]["Properties"]["Stages"][3]["Actions"][1];
        assert_eq!(delete["RoleArn"]["Fn::GetAtt"][0], "DestroyStageRole");
        assert_eq!(
            template["Resources"]["Pipeline"]["DependsOn"],
            json!(["PipelineRole", "DestroyStageRole"])
        );
    }

    #[test]
    fn test_stage_role_trusts_pipeline_role() {
        let mut settings = Settings::default();
        settings.stage_policies.insert(
            StageKind::Deploy,
            vec!["arn:aws:iam::aws:policy/PowerUserAccess".to_string()],
        );
        let template = rendered(&settings);

        let principal = |id: &str| {
            template["Resources"][id]["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]
                ["Principal"]
                .clone()
        };
        let deploy = principal("DeployStageRole");
        assert_eq!(deploy["AWS"], json!([{ "Fn::GetAtt": ["PipelineRole", "Arn"] }]));
        assert_eq!(deploy["Service"].as_array().unwrap().len(), 3);
        assert!(principal("PipelineRole").get("AWS").is_none());
    }

    #[test]
    fn test_apply_tags() {
        let mut template = rendered(&Settings::default());
        let mut tags = TagSet::new();
        tags.add("Application", "orders");
        apply_tags(&mut template, &tags);

        let resources = &template["Resources"];
        assert_eq!(
            resources["PipelineRole"]["Properties"]["Tags"],
            json!([{ "Key": "Application", "Value": "orders" }])
        );
        assert_eq!(
            resources["EnvironmentParameter"]["Properties"]["Tags"],
            json!({ "Application": "orders" })
        );
        assert!(resources["PipelineSourceWebhook"]["Properties"].get("Tags").is_none());
    }
}
