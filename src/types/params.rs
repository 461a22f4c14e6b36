//! Parameter set - read-only snapshot of named query parameter values

use crate::types::Value;
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from parameter name to current value
///
/// Owned by the query context and read (never mutated) by the row source
/// when executing. Built up with `set` before being handed to a context;
/// from then on it is a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterSet {
    values: HashMap<String, Value, RandomState>,
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style variant of `set`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no parameters are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (name, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render the parameters as a JSON object string (for command logging)
    pub fn to_json(&self) -> String {
        // Sort names so log output is stable
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();

        let map: serde_json::Map<String, serde_json::Value> = names
            .into_iter()
            .map(|name| {
                let value = serde_json::to_value(&self.values[name])
                    .unwrap_or(serde_json::Value::Null);
                (name.to_string(), value)
            })
            .collect();

        serde_json::Value::Object(map).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_set_basic() {
        let params = ParameterSet::new()
            .with("min_age", 18i64)
            .with("name", "alice");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("min_age"), Some(&Value::Integer(18)));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_parameter_set_overwrite() {
        let mut params = ParameterSet::new();
        params.set("limit", 10i64);
        params.set("limit", 20i64);

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("limit"), Some(&Value::Integer(20)));
    }

    #[test]
    fn test_to_json_stable_order() {
        let params = ParameterSet::new().with("b", 2i64).with("a", 1i64);
        let json = params.to_json();
        assert!(json.find("\"a\"").unwrap() < json.find("\"b\"").unwrap());
    }
}
