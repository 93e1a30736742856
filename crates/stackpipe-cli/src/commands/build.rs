//! Local build command.

use anyhow::{Context, Result};
use stackpipe_core::parameter::ParameterStore;
use stackpipe_runner::{AwsCliParameterStore, LocalBuildRunner, StaticParameterStore};
use stackpipe_synth::declare;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(settings_path: Option<&Path>, source: &Path, offline: bool) -> Result<()> {
    let (config, settings) = super::load(settings_path)?;
    let declaration = declare(&config, &settings).context("Pipeline declaration is invalid")?;

    let store: Arc<dyn ParameterStore> = if offline {
        info!("Using resolved parameter values (offline)");
        Arc::new(StaticParameterStore::from(declaration.parameters.as_slice()))
    } else {
        Arc::new(AwsCliParameterStore::new())
    };

    let plan = &declaration.project.plan;
    let source = source
        .canonicalize()
        .with_context(|| format!("Failed to resolve source tree {}", source.display()))?;

    let bundle = LocalBuildRunner::new(store)
        .run(plan, &source)
        .await
        .context("Local build failed")?;

    println!("Built artifact {}:", bundle.artifact.name);
    for file in &bundle.files {
        println!("  {}", bundle.root.join(file).display());
    }
    Ok(())
}
