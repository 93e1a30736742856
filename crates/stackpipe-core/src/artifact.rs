//! Artifacts handed off between pipeline stages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the artifact produced by the source stage.
pub const SOURCE_ARTIFACT: &str = "SourceArtifact";
/// Name of the artifact produced by the build stage.
pub const MODIFIED_ARTIFACT: &str = "ModifiedArtifact";

/// An opaque, named bundle of files passed between stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Reference a file inside this artifact.
    pub fn at_path(&self, path: impl Into<String>) -> ArtifactPath {
        ArtifactPath {
            artifact: self.clone(),
            path: path.into(),
        }
    }
}

/// A file inside an artifact, rendered as `Artifact::path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPath {
    pub artifact: Artifact,
    pub path: String,
}

impl std::fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.artifact.name, self.path)
    }
}

/// Files materialized on disk for an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub artifact: Artifact,
    /// Directory the file paths are relative to.
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}
