//! Declarative plan test cases.

use std::collections::BTreeMap;

use crate::compare::{ComparisonKind, Operand};
use crate::retrieve::Retriever;

static DEFAULT_RETRIEVER: Retriever = Retriever::ResourceAttribute;

/// One expectation about a plan.
///
/// Unset retrieval defaults to [`Retriever::ResourceAttribute`] and unset
/// comparison to [`ComparisonKind::Equal`].
#[derive(Debug, Clone)]
pub struct TestCase {
    resource: String,
    attribute_path: String,
    expected: Operand,
    retriever: Option<Retriever>,
    comparison: Option<ComparisonKind>,
    message: Option<String>,
}

impl TestCase {
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        attribute_path: impl Into<String>,
        expected: impl Into<Operand>,
    ) -> Self {
        Self {
            resource: resource.into(),
            attribute_path: attribute_path.into(),
            expected: expected.into(),
            retriever: None,
            comparison: None,
            message: None,
        }
    }

    /// The resource at `address` must not be planned.
    #[must_use]
    pub fn resource_absent(address: impl Into<String>) -> Self {
        let address = address.into();
        let message = format!("{address} should not be planned");
        Self::new(address, "", "false")
            .with_retriever(Retriever::ResourcePresence)
            .with_message(message)
    }

    /// The resource at `address` must be planned.
    #[must_use]
    pub fn resource_present(address: impl Into<String>) -> Self {
        let address = address.into();
        let message = format!("{address} should be planned");
        Self::new(address, "", "true")
            .with_retriever(Retriever::ResourcePresence)
            .with_message(message)
    }

    /// A planned output's rendered value.
    #[must_use]
    pub fn output(name: impl Into<String>, expected: impl Into<Operand>) -> Self {
        Self::new(name, "", expected).with_retriever(Retriever::Output)
    }

    /// An input variable's rendered value.
    #[must_use]
    pub fn variable(name: impl Into<String>, expected: impl Into<Operand>) -> Self {
        Self::new(name, "", expected).with_retriever(Retriever::RawVariable)
    }

    #[must_use]
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    #[must_use]
    pub fn with_comparison(mut self, comparison: ComparisonKind) -> Self {
        self.comparison = Some(comparison);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn attribute_path(&self) -> &str {
        &self.attribute_path
    }

    #[must_use]
    pub fn expected(&self) -> &Operand {
        &self.expected
    }

    #[must_use]
    pub fn retriever(&self) -> &Retriever {
        self.retriever.as_ref().unwrap_or(&DEFAULT_RETRIEVER)
    }

    #[must_use]
    pub fn comparison(&self) -> ComparisonKind {
        self.comparison.unwrap_or_default()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Expected value and query for one attribute of a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrTuple {
    pub expected_value: String,
    pub json_path: String,
}

impl AttrTuple {
    #[must_use]
    pub fn new(expected_value: impl Into<String>, json_path: impl Into<String>) -> Self {
        Self {
            expected_value: expected_value.into(),
            json_path: json_path.into(),
        }
    }
}

/// Attribute expectations for one member of a family of resources, e.g. one
/// node pool or one subnet. The member's name fills `{name}` in the address
/// template passed to [`run_tuple_tests`](crate::run_tuple_tests).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleTestCase {
    pub expected: BTreeMap<String, AttrTuple>,
}

impl TupleTestCase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attr(
        mut self,
        name: impl Into<String>,
        expected_value: impl Into<String>,
        json_path: impl Into<String>,
    ) -> Self {
        self.expected
            .insert(name.into(), AttrTuple::new(expected_value, json_path));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_attribute_lookup_and_equality() {
        let case = TestCase::new("azurerm_container_registry.acr[0]", "{$.sku}", "Standard");
        assert!(matches!(case.retriever(), Retriever::ResourceAttribute));
        assert_eq!(case.comparison(), ComparisonKind::Equal);
        assert_eq!(case.message(), None);
        assert_eq!(case.expected(), &Operand::from("Standard"));
    }

    #[test]
    fn resource_absent_checks_presence() {
        let case = TestCase::resource_absent("azurerm_container_registry.acr[0]");
        assert!(matches!(case.retriever(), Retriever::ResourcePresence));
        assert_eq!(case.expected(), &Operand::from("false"));
        assert_eq!(
            case.message(),
            Some("azurerm_container_registry.acr[0] should not be planned")
        );
    }

    #[test]
    fn tuple_builder_collects_attributes() {
        let tuple = TupleTestCase::new()
            .attr("machine_type", "Standard_E16ds_v5", "{$.vm_size}")
            .attr("os_disk_size", "200", "{$.os_disk_size_gb}");
        assert_eq!(tuple.expected.len(), 2);
        assert_eq!(tuple.expected["os_disk_size"].json_path, "{$.os_disk_size_gb}");
    }
}
