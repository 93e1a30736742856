//! Error types for stackpipe.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid pipeline topology: {0}")]
    InvalidTopology(String),

    #[error("invalid build plan: {0}")]
    InvalidBuildPlan(String),

    #[error("caller identity lookup failed: {0}")]
    IdentityLookup(String),

    #[error("parameter lookup failed for {name}: {message}")]
    ParameterLookup { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
