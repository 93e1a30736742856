//! Descriptive labels stamped onto the deployment unit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Ordered set of tags; adding an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|t| t.key == key) {
            Some(existing) => existing.value = value,
            None => self.0.push(Tag { key, value }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `[{"Key": .., "Value": ..}]` form used by most resource types.
    pub fn to_list(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|t| json!({ "Key": t.key, "Value": t.value }))
                .collect(),
        )
    }

    /// `{"key": "value"}` form used by parameter resources.
    pub fn to_map(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|t| (t.key.clone(), Value::String(t.value.clone())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_existing_key() {
        let mut tags = TagSet::new();
        tags.add("Environment", "development");
        tags.add("Owner", "ops");
        tags.add("Environment", "production");

        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("Environment"), Some("production"));
        assert_eq!(tags.iter().next().unwrap().key, "Environment");
    }

    #[test]
    fn test_render_forms() {
        let mut tags = TagSet::new();
        tags.add("Application", "orders");

        assert_eq!(tags.to_list(), json!([{ "Key": "Application", "Value": "orders" }]));
        assert_eq!(tags.to_map(), json!({ "Application": "orders" }));
    }
}
