//! stackpipe CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "stackpipe")]
#[command(about = "Synthesize and exercise a CloudFormation delivery pipeline", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./stackpipe.kdl when present)
    #[arg(long, global = true, env = "STACKPIPE_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the pipeline stack template
    Synth {
        /// Output directory for the template and manifest
        #[arg(long, env = "STACKPIPE_OUT", default_value = "cdk.out")]
        out: PathBuf,
    },
    /// Validate inputs and the pipeline topology without any lookups
    Validate,
    /// Run the build stage locally against a source tree
    Build {
        /// Source tree containing the cloudformation/ directory
        #[arg(long, default_value = ".")]
        source: PathBuf,
        /// Use the resolved values instead of reading the parameter store
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings.as_deref();

    match cli.command {
        Commands::Synth { out } => {
            commands::synth::run(settings, &out)?;
        }
        Commands::Validate => {
            commands::validate::run(settings)?;
        }
        Commands::Build { source, offline } => {
            commands::build::run(settings, &source, offline).await?;
        }
    }

    Ok(())
}
