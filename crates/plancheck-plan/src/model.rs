//! Structured view of a `terraform show -json` plan document.
//!
//! Resources from the root module and every nested child module are flattened
//! into one map keyed by resource address (`module.aks.azurerm_kubernetes_cluster.aks`,
//! `module.vnet[0].azurerm_subnet.subnet["aks"]`). Attribute trees are kept as
//! schema-less [`serde_json::Value`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlanError;

/// A root-module input variable as recorded in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanVariable {
    #[serde(default)]
    pub value: Value,
}

/// A planned root-module output. Unknown-until-apply outputs carry `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOutput {
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub value: Value,
}

/// One resource instance from `planned_values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedResource {
    pub address: String,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
    #[serde(default)]
    pub provider_name: String,
    /// Planned attribute tree (`AttributeValues`).
    #[serde(default)]
    pub values: Value,
}

/// One entry of `resource_changes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub address: String,
    pub actions: Vec<String>,
    pub before: Value,
    pub after: Value,
    pub after_unknown: Value,
}

impl ResourceChange {
    /// True when the change only creates the resource.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.actions.len() == 1 && self.actions[0] == "create"
    }
}

#[derive(Debug, Deserialize)]
struct ShowDocument {
    #[serde(default)]
    format_version: String,
    #[serde(default)]
    terraform_version: String,
    #[serde(default)]
    variables: BTreeMap<String, PlanVariable>,
    #[serde(default)]
    planned_values: Option<PlannedValues>,
    #[serde(default)]
    resource_changes: Vec<RawResourceChange>,
}

#[derive(Debug, Deserialize)]
struct PlannedValues {
    #[serde(default)]
    outputs: BTreeMap<String, PlannedOutput>,
    #[serde(default)]
    root_module: Option<Module>,
}

#[derive(Debug, Deserialize)]
struct Module {
    #[serde(default)]
    resources: Vec<PlannedResource>,
    #[serde(default)]
    child_modules: Vec<Module>,
}

#[derive(Debug, Deserialize)]
struct RawResourceChange {
    address: String,
    change: ChangeBody,
}

#[derive(Debug, Deserialize)]
struct ChangeBody {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    before: Value,
    #[serde(default)]
    after: Value,
    #[serde(default)]
    after_unknown: Value,
}

/// A parsed plan. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub format_version: String,
    pub terraform_version: String,
    variables: BTreeMap<String, PlanVariable>,
    outputs: BTreeMap<String, PlannedOutput>,
    resources: BTreeMap<String, PlannedResource>,
    changes: BTreeMap<String, ResourceChange>,
}

impl Plan {
    /// Parse the output of `terraform show -json <planfile>`.
    pub fn from_show_json(json: &str) -> Result<Self, PlanError> {
        let doc: ShowDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(doc))
    }

    /// Build a plan from an already decoded show document.
    pub fn from_show_value(value: Value) -> Result<Self, PlanError> {
        let doc: ShowDocument = serde_json::from_value(value)?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: ShowDocument) -> Self {
        let mut resources = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        if let Some(planned) = doc.planned_values {
            outputs = planned.outputs;
            if let Some(root) = planned.root_module {
                flatten_module(root, &mut resources);
            }
        }

        let changes = doc
            .resource_changes
            .into_iter()
            .map(|raw| {
                let change = ResourceChange {
                    address: raw.address.clone(),
                    actions: raw.change.actions,
                    before: raw.change.before,
                    after: raw.change.after,
                    after_unknown: raw.change.after_unknown,
                };
                (raw.address, change)
            })
            .collect();

        Self {
            format_version: doc.format_version,
            terraform_version: doc.terraform_version,
            variables: doc.variables,
            outputs,
            resources,
            changes,
        }
    }

    #[must_use]
    pub fn resource(&self, address: &str) -> Option<&PlannedResource> {
        self.resources.get(address)
    }

    /// Attribute tree of the resource at `address`.
    #[must_use]
    pub fn resource_values(&self, address: &str) -> Option<&Value> {
        self.resources.get(address).map(|r| &r.values)
    }

    #[must_use]
    pub fn has_resource(&self, address: &str) -> bool {
        self.resources.contains_key(address)
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&PlanVariable> {
        self.variables.get(name)
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<&PlannedOutput> {
        self.outputs.get(name)
    }

    #[must_use]
    pub fn change(&self, address: &str) -> Option<&ResourceChange> {
        self.changes.get(address)
    }

    pub fn resource_addresses(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

fn flatten_module(module: Module, out: &mut BTreeMap<String, PlannedResource>) {
    for resource in module.resources {
        out.insert(resource.address.clone(), resource);
    }
    for child in module.child_modules {
        flatten_module(child, out);
    }
}
