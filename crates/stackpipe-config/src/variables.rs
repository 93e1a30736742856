//! Placeholder substitution for build configuration files.
//!
//! Placeholders look like `${NAME}`. Each substitution replaces exactly one
//! placeholder name and leaves every other placeholder untouched, so a file
//! can be filled in over several ordered steps.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Regex for matching ${...} placeholders
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Variables captured while a build runs.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    values: HashMap<String, String>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    /// Replace every placeholder with a known value; unknown ones are preserved.
    pub fn interpolate(&self, input: &str) -> String {
        PLACEHOLDER_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let name = &caps[1];
                self.get(name)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| format!("${{{}}}", name))
            })
            .to_string()
    }
}

/// Replace every occurrence of `${placeholder}` with `value`.
pub fn substitute(input: &str, placeholder: &str, value: &str) -> String {
    input.replace(&token(placeholder), value)
}

/// Number of `${placeholder}` occurrences in `input`.
pub fn occurrences(input: &str, placeholder: &str) -> usize {
    input.matches(&token(placeholder)).count()
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_REGEX.captures_iter(input) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn token(placeholder: &str) -> String {
    format!("${{{}}}", placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIGURATION: &str = r#"{
  "Parameters": {
    "MainResourcesName": "${MAIN_RESOURCES_NAME}",
    "Environment": "${ENVIRONMENT}",
    "CreationDate": "${CREATION_DATE}"
  },
  "Tags": { "Environment": "${ENVIRONMENT}" }
}"#;

    #[test]
    fn test_substitute_replaces_every_occurrence() {
        let result = substitute(CONFIGURATION, "ENVIRONMENT", "development");
        assert_eq!(occurrences(&result, "ENVIRONMENT"), 0);
        assert_eq!(result.matches("development").count(), 2);
    }

    #[test]
    fn test_substitute_leaves_other_placeholders() {
        let result = substitute(CONFIGURATION, "ENVIRONMENT", "development");
        assert!(result.contains("${MAIN_RESOURCES_NAME}"));
        assert!(result.contains("${CREATION_DATE}"));
        assert_eq!(
            placeholders(&result),
            vec!["MAIN_RESOURCES_NAME", "CREATION_DATE"]
        );
    }

    #[test]
    fn test_substitute_is_exact() {
        let result = substitute("${ENV} ${ENVIRONMENT}", "ENV", "x");
        assert_eq!(result, "x ${ENVIRONMENT}");
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders(CONFIGURATION),
            vec!["MAIN_RESOURCES_NAME", "ENVIRONMENT", "CREATION_DATE"]
        );
        assert_eq!(occurrences(CONFIGURATION, "ENVIRONMENT"), 2);
    }

    #[test]
    fn test_interpolate_preserves_unknown() {
        let mut ctx = VariableContext::new();
        ctx.set("ENVIRONMENT", "production");
        assert_eq!(
            ctx.interpolate("${ENVIRONMENT}/${UNKNOWN}"),
            "production/${UNKNOWN}"
        );
    }

    #[test]
    fn test_nested_braces() {
        let mut ctx = VariableContext::new();
        ctx.set("MAIN_RESOURCES_NAME", "orders");

        // Make sure we don't mess up JSON or other nested braces
        let result = ctx.interpolate(r#"{"name": "${MAIN_RESOURCES_NAME}"}"#);
        assert_eq!(result, r#"{"name": "orders"}"#);
    }
}
