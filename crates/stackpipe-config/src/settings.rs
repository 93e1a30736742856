//! Settings file parsing (stackpipe.kdl).
//!
//! Every value has a default, so the file is optional:
//!
//! ```kdl
//! region "us-east-1"
//! source owner="san99tiago" repo="aws-codepipeline-simple-cf" branch="main"
//! secret "my-github-token" field="token"
//! owner "san99tiago"
//! repository-url "https://github.com/san99tiago/aws-codepipeline-simple-cf"
//! build image="aws/codebuild/standard:7.0" compute="BUILD_GENERAL1_SMALL"
//! shared-role {
//!     managed-policy "arn:aws:iam::aws:policy/AdministratorAccess"
//! }
//! role "deploy" {
//!     managed-policy "arn:aws:iam::aws:policy/PowerUserAccess"
//! }
//! ```

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use stackpipe_core::environment::DEFAULT_REGION;
use stackpipe_core::pipeline::StageKind;
use stackpipe_core::role::ADMINISTRATOR_ACCESS;
use stackpipe_core::secret::SecretReference;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Default settings file name looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "stackpipe.kdl";

const DEFAULT_SOURCE_OWNER: &str = "san99tiago";
const DEFAULT_SOURCE_REPO: &str = "aws-codepipeline-simple-cf";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_SECRET: &str = "my-github-token";
const DEFAULT_SECRET_FIELD: &str = "token";
const DEFAULT_BUILD_IMAGE: &str = "aws/codebuild/standard:7.0";
const DEFAULT_COMPUTE_TYPE: &str = "BUILD_GENERAL1_SMALL";

/// Values the pipeline treats as fixed for a given solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub region: String,
    pub source: SourceSettings,
    /// Credential for the source repository.
    pub secret: SecretReference,
    /// Value of the `Owner` tag; the source owner when unset.
    pub owner: Option<String>,
    /// Value of the `GitHubRepo` tag; the source repository when unset.
    pub repository_url: Option<Url>,
    pub build: BuildSettings,
    /// Managed policies of the shared role.
    pub shared_policies: Vec<String>,
    /// Stages that run under their own role, with its managed policies.
    pub stage_policies: BTreeMap<StageKind, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    pub image: String,
    pub compute_type: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            source: SourceSettings {
                owner: DEFAULT_SOURCE_OWNER.to_string(),
                repo: DEFAULT_SOURCE_REPO.to_string(),
                branch: DEFAULT_BRANCH.to_string(),
            },
            owner: None,
            repository_url: None,
            secret: SecretReference::new(DEFAULT_SECRET).with_field(DEFAULT_SECRET_FIELD),
            build: BuildSettings {
                image: DEFAULT_BUILD_IMAGE.to_string(),
                compute_type: DEFAULT_COMPUTE_TYPE.to_string(),
            },
            shared_policies: vec![ADMINISTRATOR_ACCESS.to_string()],
            stage_policies: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn owner(&self) -> &str {
        self.owner.as_deref().unwrap_or(&self.source.owner)
    }

    pub fn repository_url(&self) -> String {
        match &self.repository_url {
            Some(url) => url.to_string(),
            None => format!("https://github.com/{}/{}", self.source.owner, self.source.repo),
        }
    }

    /// Load settings from `path`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = parse_settings(&content)?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load `path` if given, else the default file if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_SETTINGS_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    debug!("No settings file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Parse settings from KDL text, starting from defaults.
pub fn parse_settings(kdl: &str) -> ConfigResult<Settings> {
    let doc: KdlDocument = kdl.parse()?;
    let mut settings = Settings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "region" => {
                settings.region = required_arg(node, "region")?;
            }
            "source" => {
                if let Some(owner) = get_string_prop(node, "owner") {
                    settings.source.owner = owner;
                }
                if let Some(repo) = get_string_prop(node, "repo") {
                    settings.source.repo = repo;
                }
                if let Some(branch) = get_string_prop(node, "branch") {
                    settings.source.branch = branch;
                }
            }
            "secret" => {
                let mut secret = SecretReference::new(required_arg(node, "secret")?);
                if let Some(field) = get_string_prop(node, "field") {
                    secret = secret.with_field(field);
                }
                settings.secret = secret;
            }
            "owner" => {
                settings.owner = Some(required_arg(node, "owner")?);
            }
            "repository-url" => {
                let raw = required_arg(node, "repository-url")?;
                let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
                    field: "repository-url".to_string(),
                    message: e.to_string(),
                })?;
                settings.repository_url = Some(url);
            }
            "build" => {
                if let Some(image) = get_string_prop(node, "image") {
                    settings.build.image = image;
                }
                if let Some(compute) = get_string_prop(node, "compute") {
                    settings.build.compute_type = compute;
                }
            }
            "shared-role" => {
                let policies = managed_policies(node);
                if policies.is_empty() {
                    return Err(ConfigError::MissingField(
                        "managed-policy for shared-role".to_string(),
                    ));
                }
                settings.shared_policies = policies;
            }
            "role" => {
                let raw = required_arg(node, "role")?;
                let stage = StageKind::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                    field: "role".to_string(),
                    message: format!("unknown stage '{}'", raw),
                })?;
                if !stage.has_action_role() {
                    return Err(ConfigError::InvalidValue {
                        field: "role".to_string(),
                        message: format!("stage '{}' runs under the pipeline role", stage),
                    });
                }
                let policies = managed_policies(node);
                if policies.is_empty() {
                    return Err(ConfigError::MissingField(format!(
                        "managed-policy for role '{}'",
                        stage
                    )));
                }
                if settings.stage_policies.insert(stage, policies).is_some() {
                    return Err(ConfigError::Duplicate(format!("role for stage '{}'", stage)));
                }
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(settings)
}

fn managed_policies(node: &KdlNode) -> Vec<String> {
    let mut policies = Vec::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "managed-policy" {
                policies.extend(get_all_string_args(child));
            }
        }
    }
    policies
}

// Helper functions for extracting values from KDL nodes

fn required_arg(node: &KdlNode, field: &str) -> ConfigResult<String> {
    get_first_string_arg(node).ok_or_else(|| ConfigError::InvalidValue {
        field: field.to_string(),
        message: "expected a string argument".to_string(),
    })
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}
