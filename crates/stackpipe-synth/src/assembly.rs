//! The synthesis pass and its on-disk output.

use chrono::NaiveDate;
use serde_json::{Value, json};
use stackpipe_config::Settings;
use stackpipe_core::DeploymentConfig;
use stackpipe_core::identity::IdentityProvider;
use stackpipe_core::parameter::NamedParameter;
use stackpipe_core::pipeline::Pipeline;
use stackpipe_core::role::RolePlan;
use stackpipe_core::tags::TagSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::topology::{BuildProject, declare_build_project, declare_pipeline};
use crate::{SynthResult, publisher, roles, tagger, template};

/// Everything declared for one deployment unit, before rendering.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub parameters: Vec<NamedParameter>,
    pub roles: RolePlan,
    pub project: BuildProject,
    pub pipeline: Pipeline,
}

/// Declare parameters, roles, build project and pipeline. Pure; no lookups.
pub fn declare(config: &DeploymentConfig, settings: &Settings) -> SynthResult<Declaration> {
    let parameters = publisher::publish_parameters(config)?;
    let roles = roles::role_plan(config, settings);
    let project = declare_build_project(config, settings, &parameters, &roles)?;
    let pipeline = declare_pipeline(config, settings, &roles, &project)?;

    Ok(Declaration {
        parameters,
        roles,
        project,
        pipeline,
    })
}

/// A synthesized, tagged stack ready for the orchestration service.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    pub stack_name: String,
    pub description: String,
    /// `aws://<account>/<region>`
    pub environment: String,
    pub tags: TagSet,
    pub template: Value,
}

/// Run the full declaration pass. Any error aborts the whole pass.
pub fn synthesize(
    config: &DeploymentConfig,
    settings: &Settings,
    identity: &dyn IdentityProvider,
    today: NaiveDate,
) -> SynthResult<CloudAssembly> {
    let declaration = declare(config, settings)?;
    let mut rendered = template::render(
        config,
        &declaration.parameters,
        &declaration.roles,
        &declaration.project,
        &declaration.pipeline,
    )?;

    let tags = tagger::collect_tags(config, settings, identity, today)?;
    template::apply_tags(&mut rendered, &tags);

    info!(stack = %config.synth_stack_name(), "Synthesized stack");
    Ok(CloudAssembly {
        stack_name: config.synth_stack_name(),
        description: config.description(),
        environment: config.target(),
        tags,
        template: rendered,
    })
}

impl CloudAssembly {
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }

    pub fn manifest(&self) -> Value {
        json!({
            "version": "1",
            "stack_name": self.stack_name,
            "environment": self.environment,
            "description": self.description,
            "template_file": self.template_file_name(),
            "tags": self.tags,
        })
    }

    /// Write the template and manifest into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> SynthResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let template_path = dir.join(self.template_file_name());
        std::fs::write(&template_path, serde_json::to_string_pretty(&self.template)?)?;

        let manifest_path = dir.join("manifest.json");
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest())?)?;

        info!(dir = %dir.display(), "Wrote cloud assembly");
        Ok(vec![template_path, manifest_path])
    }
}
