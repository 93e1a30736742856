//! Pipeline, stage and action definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::artifact::{Artifact, ArtifactPath};
use crate::secret::SecretReference;
use crate::stack::{StackActionMode, StackCapability};
use crate::{Error, Result};

/// A declared pipeline: strictly ordered stages, no backward transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Physical pipeline name.
    pub name: String,
    /// Logical id of the role the pipeline itself runs as.
    pub role: String,
    pub stages: Vec<Stage>,
}

/// The four phases of the pipeline, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Source,
    Build,
    Deploy,
    Destroy,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Source,
        StageKind::Build,
        StageKind::Deploy,
        StageKind::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Source => "source",
            StageKind::Build => "build",
            StageKind::Deploy => "deploy",
            StageKind::Destroy => "destroy",
        }
    }

    /// Name of the stage inside the pipeline.
    pub fn stage_name(&self) -> &'static str {
        match self {
            StageKind::Source => "SourceStage",
            StageKind::Build => "BuildStage",
            StageKind::Deploy => "DeployStage",
            StageKind::Destroy => "DestroyStage",
        }
    }

    /// Whether the stage's actions run under a stage-specific role.
    /// The source action is always fetched with the pipeline service role.
    pub fn has_action_role(&self) -> bool {
        !matches!(self, StageKind::Source)
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the transition into a stage is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Enabled,
    /// Completed upstream stages do not flow into this one until re-enabled.
    Disabled { reason: String },
}

impl Transition {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Transition::Enabled)
    }
}

/// A stage in a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub kind: StageKind,
    pub name: String,
    pub actions: Vec<Action>,
    /// Inbound transition state at declaration time.
    pub transition: Transition,
}

impl Stage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            name: kind.stage_name().to_string(),
            actions: Vec::new(),
            transition: Transition::Enabled,
        }
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Actions sorted by run order (stable for equal run orders).
    pub fn ordered_actions(&self) -> Vec<&Action> {
        let mut actions: Vec<&Action> = self.actions.iter().collect();
        actions.sort_by_key(|a| a.run_order);
        actions
    }
}

/// A single unit of work within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    /// Intra-stage sequencing; lower runs first, equal runs in parallel.
    pub run_order: u32,
    /// Logical id of the role the action runs as (pipeline role when absent).
    pub role: Option<String>,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            run_order: 1,
            role: None,
            kind,
        }
    }

    pub fn with_run_order(mut self, run_order: u32) -> Self {
        self.run_order = run_order;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// What an action does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionKind {
    /// Pull a snapshot of a GitHub repository branch.
    GitHubSource {
        owner: String,
        repo: String,
        branch: String,
        oauth_token: SecretReference,
        output: Artifact,
    },
    /// Run a build project over an input artifact.
    CodeBuild {
        /// Logical id of the build project.
        project: String,
        input: Artifact,
        outputs: Vec<Artifact>,
    },
    /// Create or update a stack from artifact files.
    CreateUpdateStack {
        stack_name: String,
        capabilities: Vec<StackCapability>,
        template: ArtifactPath,
        configuration: ArtifactPath,
        /// Logical id of the role the stack service assumes.
        deployment_role: String,
    },
    /// Operator checkpoint.
    ManualApproval { additional_information: String },
    /// Delete a stack.
    DeleteStack {
        stack_name: String,
        capabilities: Vec<StackCapability>,
        deployment_role: String,
    },
}

impl ActionKind {
    pub fn inputs(&self) -> Vec<&Artifact> {
        match self {
            ActionKind::CodeBuild { input, .. } => vec![input],
            ActionKind::CreateUpdateStack {
                template,
                configuration,
                ..
            } => {
                let mut inputs = vec![&template.artifact];
                if configuration.artifact != template.artifact {
                    inputs.push(&configuration.artifact);
                }
                inputs
            }
            _ => Vec::new(),
        }
    }

    pub fn outputs(&self) -> Vec<&Artifact> {
        match self {
            ActionKind::GitHubSource { output, .. } => vec![output],
            ActionKind::CodeBuild { outputs, .. } => outputs.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn stack_mode(&self) -> Option<StackActionMode> {
        match self {
            ActionKind::CreateUpdateStack { .. } => Some(StackActionMode::CreateUpdate),
            ActionKind::DeleteStack { .. } => Some(StackActionMode::DeleteOnly),
            _ => None,
        }
    }
}

impl Pipeline {
    pub fn stage(&self, kind: StageKind) -> Option<&Stage> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// Check the ordering and hand-off invariants of the declaration.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(Error::InvalidTopology("pipeline has no stages".to_string()));
        }

        // Stages strictly ordered, each kind at most once
        for pair in self.stages.windows(2) {
            if pair[0].kind >= pair[1].kind {
                return Err(Error::InvalidTopology(format!(
                    "stage '{}' cannot follow stage '{}'",
                    pair[1].name, pair[0].name
                )));
            }
        }

        if let Some(first) = self.stages.first() {
            if !first.transition.is_enabled() {
                return Err(Error::InvalidTopology(format!(
                    "first stage '{}' cannot have a disabled transition",
                    first.name
                )));
            }
        }

        // Artifacts: produced once, consumed only after production
        let mut produced: HashMap<&str, usize> = HashMap::new();
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.actions.is_empty() {
                return Err(Error::InvalidTopology(format!(
                    "stage '{}' has no actions",
                    stage.name
                )));
            }

            for action in &stage.actions {
                if action.run_order == 0 {
                    return Err(Error::InvalidTopology(format!(
                        "action '{}' in stage '{}' has run order 0",
                        action.name, stage.name
                    )));
                }
                for input in action.kind.inputs() {
                    match produced.get(input.name.as_str()) {
                        Some(&at) if at < index => {}
                        _ => {
                            return Err(Error::InvalidTopology(format!(
                                "action '{}' consumes artifact '{}' which no earlier stage produces",
                                action.name, input.name
                            )));
                        }
                    }
                }
            }

            for action in &stage.actions {
                for output in action.kind.outputs() {
                    if produced.insert(output.name.as_str(), index).is_some() {
                        return Err(Error::InvalidTopology(format!(
                            "artifact '{}' is produced more than once",
                            output.name
                        )));
                    }
                }
            }

            validate_deletions(stage)?;
        }

        if let Some(destroy) = self.stage(StageKind::Destroy) {
            if destroy.transition.is_enabled() {
                return Err(Error::InvalidTopology(
                    "destroy stage must be declared with its transition disabled".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Deletions must be gated by an approval that runs strictly earlier in the same stage.
fn validate_deletions(stage: &Stage) -> Result<()> {
    let first_approval = stage
        .actions
        .iter()
        .filter(|a| matches!(a.kind, ActionKind::ManualApproval { .. }))
        .map(|a| a.run_order)
        .min();

    for action in &stage.actions {
        if let ActionKind::DeleteStack { .. } = action.kind {
            match first_approval {
                Some(order) if order < action.run_order => {}
                _ => {
                    return Err(Error::InvalidTopology(format!(
                        "delete action '{}' in stage '{}' is not preceded by a manual approval",
                        action.name, stage.name
                    )));
                }
            }
        }
    }
    Ok(())
}
