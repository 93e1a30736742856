//! Build runner errors.

use stackpipe_core::build::BuildStep;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("step {index} ({}) failed: {source}", .step.describe())]
    StepFailed {
        index: usize,
        step: BuildStep,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Core(#[from] stackpipe_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RunnerResult<T> = std::result::Result<T, RunnerError>;
