//! Runs a build plan against a local source tree.

use chrono::{DateTime, Utc};
use stackpipe_config::variables::{self, VariableContext};
use stackpipe_core::artifact::{Artifact, ArtifactBundle, MODIFIED_ARTIFACT};
use stackpipe_core::build::{BuildPlan, BuildStep, TIMESTAMP_FORMAT};
use stackpipe_core::parameter::ParameterStore;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{RunnerError, RunnerResult};

type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Executes build steps in order; the first failure stops the run.
pub struct LocalBuildRunner {
    store: Arc<dyn ParameterStore>,
    /// Fixed build time; the current time when unset.
    timestamp: Option<DateTime<Utc>>,
}

impl LocalBuildRunner {
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            store,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Run `plan` inside `workdir`.
    ///
    /// On failure the emitted files are removed (and the output directory, if
    /// this run created it), so no partial artifact is left behind.
    pub async fn run(&self, plan: &BuildPlan, workdir: &Path) -> RunnerResult<ArtifactBundle> {
        plan.validate()?;

        let output_dir = workdir.join(&plan.output_dir);
        let created_output = !output_dir.exists();
        let mut vars = VariableContext::new();

        info!(workdir = %workdir.display(), steps = plan.steps.len(), "Starting local build");

        for (index, step) in plan.steps.iter().enumerate() {
            debug!(step = index + 1, action = %step.describe(), "Running build step");
            if let Err(source) = self.execute(step, workdir, &mut vars).await {
                error!(step = index + 1, action = %step.describe(), error = %source, "Build step failed");
                self.discard(plan, &output_dir, created_output).await;
                return Err(RunnerError::StepFailed {
                    index: index + 1,
                    step: step.clone(),
                    source,
                });
            }
        }

        if let Err(e) = self.report_unresolved(plan, workdir).await {
            error!(error = %e, "Failed to inspect build output");
            self.discard(plan, &output_dir, created_output).await;
            return Err(e);
        }

        let files: Vec<PathBuf> = plan.outputs.iter().map(PathBuf::from).collect();
        info!(files = files.len(), "Local build succeeded");
        Ok(ArtifactBundle {
            artifact: Artifact::new(MODIFIED_ARTIFACT),
            root: workdir.to_path_buf(),
            files,
        })
    }

    async fn execute(
        &self,
        step: &BuildStep,
        workdir: &Path,
        vars: &mut VariableContext,
    ) -> Result<(), StepError> {
        match step {
            BuildStep::MakeDir { path } => {
                tokio::fs::create_dir_all(workdir.join(path)).await?;
            }
            BuildStep::CaptureTimestamp { variable } => {
                let now = self.timestamp.unwrap_or_else(Utc::now);
                vars.set(variable, now.format(TIMESTAMP_FORMAT).to_string());
            }
            BuildStep::FetchParameter {
                variable,
                parameter,
            } => {
                let value = self.store.get(parameter).await?;
                vars.set(variable, value);
            }
            BuildStep::CopyFile { from, to } => {
                tokio::fs::copy(workdir.join(from), workdir.join(to))
                    .await
                    .map_err(|e| format!("cannot copy {}: {}", from, e))?;
            }
            BuildStep::Substitute {
                file,
                placeholder,
                variable,
            } => {
                let value = vars
                    .get(variable)
                    .ok_or_else(|| format!("variable {} is not set", variable))?
                    .to_string();
                let path = workdir.join(file);
                let content = tokio::fs::read_to_string(&path).await?;
                if variables::occurrences(&content, placeholder) == 0 {
                    warn!(file = %file, placeholder = %placeholder, "Placeholder not found");
                }
                tokio::fs::write(&path, variables::substitute(&content, placeholder, &value))
                    .await?;
            }
            BuildStep::Show { path } => {
                let content = tokio::fs::read_to_string(workdir.join(path)).await?;
                info!(file = %path, "Final {} file result is:\n{}", path, content);
            }
        }
        Ok(())
    }

    async fn report_unresolved(&self, plan: &BuildPlan, workdir: &Path) -> RunnerResult<()> {
        let substituted: BTreeSet<&str> = plan
            .steps
            .iter()
            .filter_map(|s| match s {
                BuildStep::Substitute { file, .. } => Some(file.as_str()),
                _ => None,
            })
            .collect();

        for file in substituted {
            let content = tokio::fs::read_to_string(workdir.join(file)).await?;
            let leftover = variables::placeholders(&content);
            if !leftover.is_empty() {
                warn!(file = %file, placeholders = ?leftover, "Unresolved placeholders remain");
            }
        }
        Ok(())
    }

    async fn discard(&self, plan: &BuildPlan, output_dir: &Path, created_output: bool) {
        let result = if created_output {
            tokio::fs::remove_dir_all(output_dir).await
        } else {
            let mut result = Ok(());
            for file in &plan.outputs {
                let path = output_dir
                    .parent()
                    .map(|root| root.join(file))
                    .unwrap_or_else(|| PathBuf::from(file));
                if path.exists() {
                    result = result.and(tokio::fs::remove_file(&path).await);
                }
            }
            result
        };
        if let Err(e) = result {
            warn!(dir = %output_dir.display(), error = %e, "Failed to discard partial artifact");
        }
    }
}
