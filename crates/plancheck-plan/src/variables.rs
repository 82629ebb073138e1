//! Terraform input variable sets.
//!
//! A [`VariableSet`] starts from a `.tfvars.json` file (the JSON flavour of a
//! Terraform variable file) and is then adjusted per run: a unique `prefix`, a
//! region, and whatever feature flags the scenario under test needs.

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::PlanError;

/// Variable that names a run; also the plan cache key.
pub const PREFIX_VARIABLE: &str = "prefix";

/// Mapping of Terraform variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    vars: BTreeMap<String, Value>,
}

impl VariableSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.tfvars.json` document. The top level must be an object.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Object(map) => Ok(Self {
                vars: map.into_iter().collect(),
            }),
            other => Err(PlanError::Config(format!(
                "variable file must contain a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Load a `.tfvars.json` file.
    pub fn from_var_file(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Set (or replace) one variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`VariableSet::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The run prefix, if set to a string.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.vars.get(PREFIX_VARIABLE).and_then(Value::as_str)
    }

    pub fn require_prefix(&self) -> Result<&str, PlanError> {
        self.prefix()
            .ok_or(PlanError::MissingVariable(PREFIX_VARIABLE))
    }

    /// SHA-256 of the canonical JSON encoding: compact, object keys sorted at
    /// every depth. Recordings store this to detect variable drift.
    #[must_use]
    pub fn digest(&self) -> String {
        let sorted: BTreeMap<&str, Value> = self
            .vars
            .iter()
            .map(|(name, value)| (name.as_str(), canonical(value)))
            .collect();
        let encoded = serde_json::to_string(&sorted).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Plan cache key: the prefix, or the content digest for prefix-less sets.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self.prefix() {
            Some(prefix) => prefix.to_string(),
            None => format!("sha256:{}", self.digest()),
        }
    }

    /// Render as a `.tfvars.json` document.
    pub fn to_var_file_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(&self.vars)?)
    }

    pub fn write_var_file(&self, path: &Path) -> Result<(), PlanError> {
        std::fs::write(path, self.to_var_file_json()?)?;
        Ok(())
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// `stem` followed by six random lowercase alphanumerics.
#[must_use]
pub fn unique_prefix(stem: &str) -> String {
    let id: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{stem}{}", id.to_ascii_lowercase())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_object_and_applies_overrides() {
        let mut vars = VariableSet::from_json(
            r#"{"prefix":"sample","kubernetes_version":"1.30","create_container_registry":false}"#,
        )
        .expect("valid tfvars json");
        vars.set("prefix", "default")
            .set("location", "eastus")
            .set("default_public_access_cidrs", vec!["123.45.67.89/16"]);

        assert_eq!(vars.prefix(), Some("default"));
        assert_eq!(vars.get("location"), Some(&json!("eastus")));
        assert_eq!(
            vars.get("default_public_access_cidrs"),
            Some(&json!(["123.45.67.89/16"]))
        );
        assert_eq!(vars.len(), 5);
    }

    #[test]
    fn rejects_non_object_var_files() {
        let err = VariableSet::from_json("[1,2]").unwrap_err();
        assert!(err.to_string().contains("an array"), "{err}");
    }

    #[test]
    fn cache_key_prefers_prefix_then_digest() {
        let named = VariableSet::new().with("prefix", "acr-premium");
        assert_eq!(named.cache_key(), "acr-premium");

        let a = VariableSet::new().with("b", 2).with("a", 1);
        let b = VariableSet::new().with("a", 1).with("b", 2);
        assert_eq!(a.cache_key(), b.cache_key());
        assert!(a.cache_key().starts_with("sha256:"));
        assert_ne!(a.digest(), VariableSet::new().with("a", 1).digest());
    }

    #[test]
    fn digest_is_over_compact_sorted_json() {
        // sha256 of {"a":"s","b":{"x":[true],"y":1}}
        let vars = VariableSet::new()
            .with("b", json!({"y": 1, "x": [true]}))
            .with("a", "s");
        assert_eq!(
            vars.digest(),
            "1a63b621155919a5309732b51b2ce6fea6bea140875833455c8ca18d9876aed9"
        );
    }

    #[test]
    fn missing_prefix_is_reported() {
        let err = VariableSet::new().require_prefix().unwrap_err();
        assert!(matches!(err, PlanError::MissingVariable("prefix")));
    }

    #[test]
    fn unique_prefix_is_lowercase_and_distinct() {
        let a = unique_prefix("terratest-");
        let b = unique_prefix("terratest-");
        assert!(a.starts_with("terratest-"));
        assert_eq!(a.len(), "terratest-".len() + 6);
        assert_eq!(a, a.to_ascii_lowercase());
        assert_ne!(a, b);
    }

    #[test]
    fn var_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vars.tfvars.json");
        let vars = VariableSet::new()
            .with("prefix", "rt")
            .with("node_pools", json!({"cas": {"machine_type": "Standard_E16ds_v5"}}));
        vars.write_var_file(&path).expect("write");
        let loaded = VariableSet::from_var_file(&path).expect("read");
        assert_eq!(loaded, vars);
    }
}
