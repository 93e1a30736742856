//! Validation command.

use anyhow::{Context, Result};
use stackpipe_core::pipeline::Transition;
use stackpipe_synth::declare;
use std::path::Path;

pub fn run(settings_path: Option<&Path>) -> Result<()> {
    let (config, settings) = super::load(settings_path)?;
    let declaration = declare(&config, &settings).context("Pipeline declaration is invalid")?;

    println!("Stack: {} ({})", config.synth_stack_name(), config.target());
    println!("Pipeline: {}", declaration.pipeline.name);
    for parameter in &declaration.parameters {
        println!("Parameter: {} = {}", parameter.path, parameter.value);
    }
    for role in declaration.roles.roles() {
        println!("Role: {} [{}]", role.role_name, role.managed_policies.join(", "));
    }
    for stage in &declaration.pipeline.stages {
        match &stage.transition {
            Transition::Enabled => println!("Stage {}", stage.name),
            Transition::Disabled { reason } => {
                println!("Stage {} (transition disabled: {})", stage.name, reason)
            }
        }
        for action in stage.ordered_actions() {
            println!("  [{}] {}", action.run_order, action.name);
        }
    }
    println!("Configuration is valid");
    Ok(())
}
