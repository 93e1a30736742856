//! Typed build plan executed by the build stage.
//!
//! Each step declares what it reads and writes, so the order of
//! substitutions and the point where a run can fail are explicit. The same
//! plan renders to buildspec shell commands for the hosted build service
//! and drives the local runner.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;

use crate::{Error, Result};

/// Directory every emitted file is written to.
pub const OUTPUT_DIR: &str = "artifacts";
/// Variable holding the build timestamp.
pub const CREATION_DATE_VAR: &str = "CREATION_DATE";
pub const MAIN_RESOURCES_NAME_VAR: &str = "MAIN_RESOURCES_NAME";
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Template read from the source snapshot.
pub const TEMPLATE_SOURCE: &str = "cloudformation/cloudformation.yml";
/// Configuration read from the source snapshot.
pub const CONFIGURATION_SOURCE: &str = "cloudformation/configuration.json";
pub const TEMPLATE_OUTPUT: &str = "artifacts/cloudformation.yml";
pub const CONFIGURATION_OUTPUT: &str = "artifacts/configuration.json";

/// Format of the captured build timestamp (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One step of the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStep {
    /// Create a directory (and parents).
    MakeDir { path: String },
    /// Store the current UTC time in a variable.
    CaptureTimestamp { variable: String },
    /// Read a parameter through the unmasked lookup path into a variable.
    FetchParameter { variable: String, parameter: String },
    /// Copy a file from the source snapshot.
    CopyFile { from: String, to: String },
    /// Replace every `${placeholder}` in `file` with the value of `variable`.
    Substitute {
        file: String,
        placeholder: String,
        variable: String,
    },
    /// Print a file to the build log.
    Show { path: String },
}

/// Something a step reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepIo {
    /// A file in the working tree (either the source snapshot or produced by an earlier step).
    File(String),
    /// A file that must come from the source snapshot.
    SourceFile(String),
    Directory(String),
    Variable(String),
    Parameter(String),
}

impl BuildStep {
    pub fn inputs(&self) -> Vec<StepIo> {
        match self {
            BuildStep::MakeDir { .. } | BuildStep::CaptureTimestamp { .. } => Vec::new(),
            BuildStep::FetchParameter { parameter, .. } => {
                vec![StepIo::Parameter(parameter.clone())]
            }
            BuildStep::CopyFile { from, to } => {
                let mut inputs = vec![StepIo::SourceFile(from.clone())];
                if let Some((parent, _)) = to.rsplit_once('/') {
                    inputs.push(StepIo::Directory(parent.to_string()));
                }
                inputs
            }
            BuildStep::Substitute { file, variable, .. } => vec![
                StepIo::File(file.clone()),
                StepIo::Variable(variable.clone()),
            ],
            BuildStep::Show { path } => vec![StepIo::File(path.clone())],
        }
    }

    pub fn outputs(&self) -> Vec<StepIo> {
        match self {
            BuildStep::MakeDir { path } => vec![StepIo::Directory(path.clone())],
            BuildStep::CaptureTimestamp { variable }
            | BuildStep::FetchParameter { variable, .. } => {
                vec![StepIo::Variable(variable.clone())]
            }
            BuildStep::CopyFile { to, .. } => vec![StepIo::File(to.clone())],
            BuildStep::Substitute { file, .. } => vec![StepIo::File(file.clone())],
            BuildStep::Show { .. } => Vec::new(),
        }
    }

    /// Render the step as buildspec shell commands.
    pub fn to_shell(&self) -> Vec<String> {
        match self {
            BuildStep::MakeDir { path } => vec![format!(r#"mkdir -p "{}""#, path)],
            BuildStep::CaptureTimestamp { variable } => {
                vec![format!(r#"export {}=$(date -u +"{}")"#, variable, TIMESTAMP_FORMAT)]
            }
            BuildStep::FetchParameter {
                variable,
                parameter,
            } => vec![format!(
                r#"export {}=$(aws ssm get-parameter --name "{}" --query "Parameter.Value" --output text)"#,
                variable, parameter
            )],
            BuildStep::CopyFile { from, to } => vec![format!(r#"cp "{}" "{}""#, from, to)],
            BuildStep::Substitute {
                file,
                placeholder,
                variable,
            } => vec![format!(
                r#"sed -e "s|\${{{placeholder}}}|${variable}|g" "{file}" > "{file}.tmp" && mv "{file}.tmp" "{file}""#
            )],
            BuildStep::Show { path } => vec![
                format!(r#"echo "Final {} file result is:""#, path),
                format!(r#"cat "{}""#, path),
            ],
        }
    }

    /// Short human label for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            BuildStep::MakeDir { path } => format!("create directory {}", path),
            BuildStep::CaptureTimestamp { variable } => format!("capture timestamp into {}", variable),
            BuildStep::FetchParameter {
                variable,
                parameter,
            } => format!("fetch parameter {} into {}", parameter, variable),
            BuildStep::CopyFile { from, to } => format!("copy {} to {}", from, to),
            BuildStep::Substitute {
                file, placeholder, ..
            } => format!("substitute ${{{}}} in {}", placeholder, file),
            BuildStep::Show { path } => format!("show {}", path),
        }
    }
}

/// Ordered build steps plus the files they emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub steps: Vec<BuildStep>,
    /// Directory holding the emitted files.
    pub output_dir: String,
    /// Files emitted as the output artifact.
    pub outputs: Vec<String>,
}

impl BuildPlan {
    /// The canonical plan: stage the template and configuration, then fill the
    /// configuration's placeholders from the published parameters.
    pub fn standard(resource_name_parameter: &str, environment_parameter: &str) -> Self {
        let substitute = |name: &str| BuildStep::Substitute {
            file: CONFIGURATION_OUTPUT.to_string(),
            placeholder: name.to_string(),
            variable: name.to_string(),
        };

        Self {
            steps: vec![
                BuildStep::MakeDir {
                    path: OUTPUT_DIR.to_string(),
                },
                BuildStep::CaptureTimestamp {
                    variable: CREATION_DATE_VAR.to_string(),
                },
                BuildStep::FetchParameter {
                    variable: MAIN_RESOURCES_NAME_VAR.to_string(),
                    parameter: resource_name_parameter.to_string(),
                },
                BuildStep::FetchParameter {
                    variable: ENVIRONMENT_VAR.to_string(),
                    parameter: environment_parameter.to_string(),
                },
                BuildStep::CopyFile {
                    from: TEMPLATE_SOURCE.to_string(),
                    to: TEMPLATE_OUTPUT.to_string(),
                },
                BuildStep::CopyFile {
                    from: CONFIGURATION_SOURCE.to_string(),
                    to: CONFIGURATION_OUTPUT.to_string(),
                },
                substitute(MAIN_RESOURCES_NAME_VAR),
                substitute(ENVIRONMENT_VAR),
                substitute(CREATION_DATE_VAR),
                BuildStep::Show {
                    path: CONFIGURATION_OUTPUT.to_string(),
                },
            ],
            output_dir: OUTPUT_DIR.to_string(),
            outputs: vec![TEMPLATE_OUTPUT.to_string(), CONFIGURATION_OUTPUT.to_string()],
        }
    }

    /// Every variable and produced file must exist before a step reads it,
    /// and every emitted file must be produced by some step.
    pub fn validate(&self) -> Result<()> {
        let mut available: HashSet<StepIo> = HashSet::new();

        for (index, step) in self.steps.iter().enumerate() {
            for input in step.inputs() {
                let satisfied = match &input {
                    StepIo::Variable(_) | StepIo::File(_) => available.contains(&input),
                    // Only the output directory is created by the plan itself.
                    StepIo::Directory(dir) => {
                        !self.is_output_path(dir) || available.contains(&input)
                    }
                    StepIo::SourceFile(_) | StepIo::Parameter(_) => true,
                };
                if !satisfied {
                    return Err(Error::InvalidBuildPlan(format!(
                        "step {} ({}) reads {:?} before any step provides it",
                        index + 1,
                        step.describe(),
                        input
                    )));
                }
            }
            available.extend(step.outputs());
        }

        for output in &self.outputs {
            if !available.contains(&StepIo::File(output.clone())) {
                return Err(Error::InvalidBuildPlan(format!(
                    "emitted file {} is never produced",
                    output
                )));
            }
        }
        Ok(())
    }

    fn is_output_path(&self, path: &str) -> bool {
        path == self.output_dir
            || path
                .strip_prefix(self.output_dir.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn commands(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.to_shell()).collect()
    }

    /// Buildspec document (version 0.2) for the hosted build project.
    pub fn to_buildspec(&self) -> Value {
        json!({
            "version": "0.2",
            "phases": {
                "build": {
                    "commands": self.commands(),
                }
            },
            "artifacts": {
                "files": [format!("{}/*", self.output_dir)],
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> BuildPlan {
        BuildPlan::standard(
            "/production/orders/main_resources_name",
            "/production/orders/environment",
        )
    }

    #[test]
    fn test_standard_plan_is_valid() {
        assert!(plan().validate().is_ok());
    }

    #[test]
    fn test_substitution_order() {
        let placeholders: Vec<String> = plan()
            .steps
            .iter()
            .filter_map(|s| match s {
                BuildStep::Substitute { placeholder, .. } => Some(placeholder.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            placeholders,
            vec!["MAIN_RESOURCES_NAME", "ENVIRONMENT", "CREATION_DATE"]
        );
    }

    #[test]
    fn test_substitute_before_copy_is_rejected() {
        let mut plan = plan();
        // Move the first substitution ahead of the copies
        let substitute = plan.steps.remove(6);
        plan.steps.insert(1, substitute);
        assert!(matches!(plan.validate(), Err(Error::InvalidBuildPlan(_))));
    }

    #[test]
    fn test_copy_before_output_dir_is_rejected() {
        let mut plan = plan();
        let make_dir = plan.steps.remove(0);
        assert!(matches!(make_dir, BuildStep::MakeDir { .. }));
        plan.steps.push(make_dir);

        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("Directory(\"artifacts\")"));
    }

    #[test]
    fn test_copy_into_source_tree_needs_no_mkdir() {
        let plan = BuildPlan {
            steps: vec![BuildStep::CopyFile {
                from: TEMPLATE_SOURCE.to_string(),
                to: "cloudformation/backup.yml".to_string(),
            }],
            output_dir: OUTPUT_DIR.to_string(),
            outputs: Vec::new(),
        };
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_unproduced_output_is_rejected() {
        let mut plan = plan();
        plan.outputs.push("artifacts/missing.json".to_string());
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_shell_rendering() {
        let step = BuildStep::Substitute {
            file: "artifacts/configuration.json".to_string(),
            placeholder: "ENVIRONMENT".to_string(),
            variable: "ENVIRONMENT".to_string(),
        };
        assert_eq!(
            step.to_shell(),
            vec![
                r#"sed -e "s|\${ENVIRONMENT}|$ENVIRONMENT|g" "artifacts/configuration.json" > "artifacts/configuration.json.tmp" && mv "artifacts/configuration.json.tmp" "artifacts/configuration.json""#
            ]
        );

        let fetch = BuildStep::FetchParameter {
            variable: "ENVIRONMENT".to_string(),
            parameter: "/production/orders/environment".to_string(),
        };
        assert!(fetch.to_shell()[0].contains("aws ssm get-parameter --name \"/production/orders/environment\""));
    }

    #[test]
    fn test_buildspec_shape() {
        let spec = plan().to_buildspec();
        assert_eq!(spec["version"], "0.2");
        assert_eq!(spec["artifacts"]["files"][0], "artifacts/*");
        let commands = spec["phases"]["build"]["commands"].as_array().unwrap();
        assert_eq!(commands[0], r#"mkdir -p "artifacts""#);
        assert_eq!(commands.len(), 11);
    }
}
