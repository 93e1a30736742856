//! Synthesis errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Core(#[from] stackpipe_core::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SynthResult<T> = std::result::Result<T, SynthError>;
