use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::json_path::select_path;

/// Errors raised while mapping a decoded payload onto result shapes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("root property path '{path}' was not found in the decoded payload")]
    RootPathNotFound { path: String },

    #[error("data at '{path}' is not a collection")]
    NotACollection { path: String },
}

impl MappingError {
    pub fn root_path_not_found(path: impl Into<String>) -> Self {
        Self::RootPathNotFound { path: path.into() }
    }

    pub fn not_a_collection(path: impl Into<String>) -> Self {
        Self::NotACollection { path: path.into() }
    }
}

/// Ordered mapping from output property names to dotted source paths.
///
/// Applied to each item after root selection. Source paths that do not
/// resolve produce `null` so every mapped item has the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap {
    fields: IndexMap<String, String>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `target <- source` mapping.
    pub fn with_field(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.fields.insert(target.into(), source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn apply(&self, item: &Value) -> Value {
        let mut mapped = Map::with_capacity(self.fields.len());
        for (target, source) in &self.fields {
            let value = select_path(item, source).cloned().unwrap_or(Value::Null);
            mapped.insert(target.clone(), value);
        }
        Value::Object(mapped)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(target, source)| (target.into(), source.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_reshapes_item_in_declared_order() {
        let map = PropertyMap::new()
            .with_field("title", "attributes.title")
            .with_field("id", "id");
        let mapped = map.apply(&json!({"id": 3, "attributes": {"title": "Hello"}}));

        let keys = mapped.as_object().map(|object| object.keys().cloned().collect::<Vec<_>>());
        assert_eq!(keys, Some(vec!["title".to_string(), "id".to_string()]));
        assert_eq!(mapped["title"], json!("Hello"));
    }

    #[test]
    fn apply_fills_missing_sources_with_null() {
        let map: PropertyMap = [("author", "meta.author")].into_iter().collect();
        assert_eq!(map.apply(&json!({"id": 1})), json!({"author": null}));
    }

    #[test]
    fn deserializes_from_plain_map() {
        let map: PropertyMap = serde_yaml::from_str("id: id\nname: profile.name\n").expect("property map");
        assert_eq!(map.len(), 2);
    }
}
