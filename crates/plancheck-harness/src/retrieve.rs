//! Where a case's actual value comes from.

use std::fmt;
use std::sync::Arc;

use plancheck_plan::{Plan, ResourceChange};
use serde_json::{Value, json};

use crate::error::ExtractionError;
use crate::extract::{ABSENT, Query, render_value};

/// Signature of a caller-supplied retrieval strategy:
/// `(plan, identifier, attribute_path) -> actual`.
pub type CustomRetriever =
    Arc<dyn Fn(&Plan, &str, &str) -> Result<String, ExtractionError> + Send + Sync>;

/// Retrieval strategy for a [`TestCase`](crate::TestCase).
#[derive(Clone, Default)]
pub enum Retriever {
    /// Query the planned attribute tree of the resource at the identifier.
    #[default]
    ResourceAttribute,
    /// Render the value of the input variable named by the identifier.
    RawVariable,
    /// Query the variable record `{"value": ...}` named by the identifier.
    RawVariablePath,
    /// Render a planned output, or query it when a path is given.
    Output,
    /// `true` when the resource is planned, else `false`.
    ResourcePresence,
    /// Query the change record `{"actions", "before", "after", "after_unknown"}`.
    ResourceChange,
    Custom(CustomRetriever),
}

impl Retriever {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Plan, &str, &str) -> Result<String, ExtractionError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResourceAttribute => "resource_attribute",
            Self::RawVariable => "raw_variable",
            Self::RawVariablePath => "raw_variable_path",
            Self::Output => "output",
            Self::ResourcePresence => "resource_presence",
            Self::ResourceChange => "resource_change",
            Self::Custom(_) => "custom",
        }
    }

    /// Resolve the actual value. Queries are parsed before the plan is
    /// consulted, so a malformed query fails even when the source is absent.
    pub fn retrieve(&self, plan: &Plan, identifier: &str, path: &str) -> Result<String, ExtractionError> {
        match self {
            Self::ResourceAttribute => {
                let query = Query::parse(path)?;
                Ok(plan
                    .resource_values(identifier)
                    .map_or_else(absent, |values| query.render(values)))
            }
            Self::RawVariable => Ok(plan
                .variable(identifier)
                .map_or_else(absent, |var| render_value(&var.value))),
            Self::RawVariablePath => {
                let query = Query::parse(path)?;
                Ok(plan
                    .variable(identifier)
                    .map_or_else(absent, |var| query.render(&json!({ "value": var.value }))))
            }
            Self::Output => {
                let query = optional_query(path)?;
                Ok(plan.output(identifier).map_or_else(absent, |out| match &query {
                    Some(query) => query.render(&out.value),
                    None => render_value(&out.value),
                }))
            }
            Self::ResourcePresence => Ok(plan.has_resource(identifier).to_string()),
            Self::ResourceChange => {
                let query = Query::parse(path)?;
                Ok(plan
                    .change(identifier)
                    .map_or_else(absent, |change| query.render(&change_record(change))))
            }
            Self::Custom(f) => f(plan, identifier, path),
        }
    }
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn absent() -> String {
    ABSENT.to_string()
}

fn optional_query(path: &str) -> Result<Option<Query>, ExtractionError> {
    if path.trim().is_empty() {
        return Ok(None);
    }
    Query::parse(path).map(Some)
}

fn change_record(change: &ResourceChange) -> Value {
    json!({
        "actions": change.actions,
        "before": change.before,
        "after": change.after,
        "after_unknown": change.after_unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::from_show_value(json!({
            "variables": {
                "prefix": {"value": "default"},
                "default_public_access_cidrs": {"value": ["123.45.67.89/16"]}
            },
            "planned_values": {
                "outputs": {
                    "location": {"value": "eastus"},
                    "nat_ip": {"value": {"ip": "10.0.0.1"}}
                },
                "root_module": {
                    "resources": [{
                        "address": "azurerm_container_registry.acr[0]",
                        "values": {"sku": "Standard", "name": "defaultacr"}
                    }]
                }
            },
            "resource_changes": [{
                "address": "azurerm_container_registry.acr[0]",
                "change": {"actions": ["create"], "before": null, "after": {"sku": "Standard"}, "after_unknown": {"id": true}}
            }]
        }))
        .expect("valid plan")
    }

    const ACR: &str = "azurerm_container_registry.acr[0]";

    #[test]
    fn resource_attribute_queries_values() {
        let plan = plan();
        let r = Retriever::default();
        assert_eq!(r.retrieve(&plan, ACR, "{$.sku}").unwrap(), "Standard");
        assert_eq!(r.retrieve(&plan, ACR, "{$.missing}").unwrap(), "<nil>");
        assert_eq!(r.retrieve(&plan, "azurerm_nothing.x", "{$.sku}").unwrap(), "nil");
    }

    #[test]
    fn malformed_query_fails_even_for_absent_resource() {
        let err = Retriever::ResourceAttribute
            .retrieve(&plan(), "azurerm_nothing.x", "{$.sku")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Parse { .. }));
    }

    #[test]
    fn variables_render_whole_or_by_path() {
        let plan = plan();
        assert_eq!(
            Retriever::RawVariable.retrieve(&plan, "prefix", "").unwrap(),
            "default"
        );
        assert_eq!(
            Retriever::RawVariable.retrieve(&plan, "default_public_access_cidrs", "").unwrap(),
            r#"["123.45.67.89/16"]"#
        );
        assert_eq!(
            Retriever::RawVariablePath
                .retrieve(&plan, "default_public_access_cidrs", "{$.value[0]}")
                .unwrap(),
            "123.45.67.89/16"
        );
        assert_eq!(Retriever::RawVariable.retrieve(&plan, "nope", "").unwrap(), "nil");
    }

    #[test]
    fn outputs_presence_and_changes() {
        let plan = plan();
        assert_eq!(Retriever::Output.retrieve(&plan, "location", "").unwrap(), "eastus");
        assert_eq!(Retriever::Output.retrieve(&plan, "nat_ip", "{$.ip}").unwrap(), "10.0.0.1");
        assert_eq!(Retriever::Output.retrieve(&plan, "absent", "").unwrap(), "nil");
        assert_eq!(Retriever::ResourcePresence.retrieve(&plan, ACR, "").unwrap(), "true");
        assert_eq!(
            Retriever::ResourcePresence.retrieve(&plan, "azurerm_nothing.x", "").unwrap(),
            "false"
        );
        assert_eq!(
            Retriever::ResourceChange.retrieve(&plan, ACR, "{$.actions[0]}").unwrap(),
            "create"
        );
    }

    #[test]
    fn custom_retriever_receives_arguments() {
        let r = Retriever::custom(|plan, id, path| {
            Ok(format!("{}:{id}:{path}", plan.resource_count()))
        });
        assert_eq!(r.retrieve(&plan(), "x", "y").unwrap(), "1:x:y");
        assert_eq!(format!("{r:?}"), "custom");
    }
}
