//! Synthesis command.

use anyhow::{Context, Result};
use stackpipe_synth::{AwsCliIdentityProvider, synthesize};
use std::path::Path;

pub fn run(settings_path: Option<&Path>, out: &Path) -> Result<()> {
    let (config, settings) = super::load(settings_path)?;

    let identity = AwsCliIdentityProvider::new();
    let today = chrono::Local::now().date_naive();
    let assembly = synthesize(&config, &settings, &identity, today)
        .with_context(|| format!("Failed to synthesize {}", config.synth_stack_name()))?;

    let written = assembly
        .write_to(out)
        .with_context(|| format!("Failed to write output to {}", out.display()))?;

    println!("Synthesized stack: {}", assembly.stack_name);
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}
