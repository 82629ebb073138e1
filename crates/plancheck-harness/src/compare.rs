//! Comparison kinds and the single-argument validator built from them.
//!
//! Each [`ComparisonKind`] names a two-argument primitive and the order in
//! which that primitive takes its arguments. Equality-style primitives take
//! `(expected, actual)`; containment primitives take `(container, element)`,
//! where the container is the actual value. [`Validator`] hides the
//! difference so a runner only ever supplies `actual`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::render_diff;

/// A comparison operand: one piece of text or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Text(String),
    List(Vec<String>),
}

impl Operand {
    /// Text form; list items are joined by one space.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(" "),
        }
    }

    /// Whitespace-separated fields of text, or the list items.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Text(s) => s.split_whitespace().collect(),
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::List(items) => write!(f, "{}", serde_json::Value::from(items.clone())),
        }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Operand {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<Vec<String>> for Operand {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<&str>> for Operand {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Operand {
    fn from(items: [&str; N]) -> Self {
        Self::List(items.iter().map(|s| (*s).to_string()).collect())
    }
}

/// How a case compares expected and actual values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    #[default]
    Equal,
    NotEqual,
    Contains,
    NotContains,
    ElementsMatch,
}

/// Which operand a primitive takes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentOrder {
    /// `primitive(expected, actual)`
    ExpectedFirst,
    /// `primitive(actual, expected)`
    ActualFirst,
}

type Primitive = fn(&Operand, &Operand) -> bool;

impl ComparisonKind {
    pub const ALL: [Self; 5] = [
        Self::Equal,
        Self::NotEqual,
        Self::Contains,
        Self::NotContains,
        Self::ElementsMatch,
    ];

    /// The primitive and its calling convention.
    fn registry(self) -> (Primitive, ArgumentOrder) {
        match self {
            Self::Equal => (equal as Primitive, ArgumentOrder::ExpectedFirst),
            Self::NotEqual => (not_equal as Primitive, ArgumentOrder::ExpectedFirst),
            Self::ElementsMatch => (elements_match as Primitive, ArgumentOrder::ExpectedFirst),
            Self::Contains => (contains as Primitive, ArgumentOrder::ActualFirst),
            Self::NotContains => (not_contains as Primitive, ArgumentOrder::ActualFirst),
        }
    }

    #[must_use]
    pub fn argument_order(self) -> ArgumentOrder {
        self.registry().1
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::ElementsMatch => "elements_match",
        }
    }

    const fn expectation(self) -> &'static str {
        match self {
            Self::Equal => "values to be equal",
            Self::NotEqual => "values to differ",
            Self::Contains => "actual to contain expected",
            Self::NotContains => "actual not to contain expected",
            Self::ElementsMatch => "the same elements in any order",
        }
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn equal(expected: &Operand, actual: &Operand) -> bool {
    expected.text() == actual.text()
}

fn not_equal(expected: &Operand, actual: &Operand) -> bool {
    !equal(expected, actual)
}

fn contains(container: &Operand, element: &Operand) -> bool {
    let element = element.text();
    match container {
        Operand::Text(text) => text.contains(&element),
        Operand::List(items) => items.iter().any(|item| *item == element),
    }
}

fn not_contains(container: &Operand, element: &Operand) -> bool {
    !contains(container, element)
}

fn elements_match(expected: &Operand, actual: &Operand) -> bool {
    fn multiset<'a>(fields: Vec<&'a str>) -> BTreeMap<&'a str, usize> {
        let mut counts = BTreeMap::new();
        for field in fields {
            *counts.entry(field).or_insert(0) += 1;
        }
        counts
    }
    multiset(expected.fields()) == multiset(actual.fields())
}

/// A comparison with its expected value bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    kind: ComparisonKind,
    expected: Operand,
}

impl Validator {
    #[must_use]
    pub fn new(kind: ComparisonKind, expected: impl Into<Operand>) -> Self {
        Self {
            kind,
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComparisonKind {
        self.kind
    }

    #[must_use]
    pub fn expected(&self) -> &Operand {
        &self.expected
    }

    /// Compare `actual` against the bound expected value.
    pub fn check(&self, actual: &Operand, message: Option<&str>) -> Result<(), ComparisonMismatch> {
        let (primitive, order) = self.kind.registry();
        let holds = match order {
            ArgumentOrder::ExpectedFirst => primitive(&self.expected, actual),
            ArgumentOrder::ActualFirst => primitive(actual, &self.expected),
        };
        if holds {
            return Ok(());
        }
        Err(ComparisonMismatch {
            kind: self.kind,
            expected: self.expected.clone(),
            actual: actual.clone(),
            message: message.map(str::to_string),
        })
    }
}

/// A comparison that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.render())]
pub struct ComparisonMismatch {
    pub kind: ComparisonKind,
    pub expected: Operand,
    pub actual: Operand,
    pub message: Option<String>,
}

impl ComparisonMismatch {
    /// Line diff of expected against actual, for multi-line equality failures.
    #[must_use]
    pub fn diff(&self) -> Option<String> {
        let (expected, actual) = (self.expected.text(), self.actual.text());
        let multi_line = expected.contains('\n') || actual.contains('\n');
        (self.kind == ComparisonKind::Equal && multi_line).then(|| render_diff(&expected, &actual))
    }

    fn render(&self) -> String {
        let headline = self.message.as_deref().unwrap_or("comparison failed");
        let mut out = format!(
            "{headline}: expected {}\n  expected: {}\n  actual:   {}",
            self.kind.expectation(),
            self.expected,
            self.actual
        );
        if let Some(diff) = self.diff() {
            out.push('\n');
            out.push_str(&diff);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use serde_json::{Map, Value, json};

    fn text(s: &str) -> Operand {
        Operand::from(s)
    }

    #[test]
    fn every_kind_has_an_argument_order() {
        for kind in ComparisonKind::ALL {
            let order = kind.argument_order();
            let containment = matches!(kind, ComparisonKind::Contains | ComparisonKind::NotContains);
            assert_eq!(order == ArgumentOrder::ActualFirst, containment, "{kind}");
        }
    }

    #[test]
    fn contains_searches_the_actual_value() {
        let validator = Validator::new(ComparisonKind::Contains, "acr");
        assert!(validator.check(&text("my-test-acr-1"), None).is_ok());

        let validator = Validator::new(ComparisonKind::Contains, "prod");
        let err = validator.check(&text("my-test-acr-1"), Some("name")).unwrap_err();
        assert_eq!(err.actual, text("my-test-acr-1"));
        assert_eq!(err.expected, text("prod"));
    }

    #[test]
    fn not_contains_is_the_negation() {
        let validator = Validator::new(ComparisonKind::NotContains, "prod");
        assert!(validator.check(&text("my-test-acr-1"), None).is_ok());
        assert!(
            Validator::new(ComparisonKind::NotContains, "acr")
                .check(&text("my-test-acr-1"), None)
                .is_err()
        );
    }

    #[test]
    fn list_container_matches_whole_items() {
        let actual = Operand::from(["eastus", "westus2"]);
        assert!(Validator::new(ComparisonKind::Contains, "westus2").check(&actual, None).is_ok());
        assert!(Validator::new(ComparisonKind::Contains, "west").check(&actual, None).is_err());
    }

    #[test]
    fn equal_and_not_equal_compare_text() {
        assert!(Validator::new(ComparisonKind::Equal, "Standard").check(&text("Standard"), None).is_ok());
        assert!(Validator::new(ComparisonKind::Equal, "Standard").check(&text("nil"), None).is_err());
        assert!(Validator::new(ComparisonKind::NotEqual, "Standard").check(&text("nil"), None).is_ok());
        assert!(
            Validator::new(ComparisonKind::Equal, ["a", "b"])
                .check(&text("a b"), None)
                .is_ok()
        );
    }

    #[test]
    fn elements_match_ignores_order_but_not_multiplicity() {
        let validator = Validator::new(ComparisonKind::ElementsMatch, ["southeastus5", "southeastus3"]);
        assert!(validator.check(&text("southeastus3 southeastus5"), None).is_ok());
        assert!(validator.check(&text("southeastus5 southeastus3"), None).is_ok());
        assert!(validator.check(&text("southeastus5"), None).is_err());
        assert!(
            validator
                .check(&text("southeastus5 southeastus3 southeastus3"), None)
                .is_err()
        );
    }

    #[test]
    fn mismatch_message_names_both_values() {
        let err = Validator::new(ComparisonKind::Equal, "Standard")
            .check(&text("nil"), Some("ACR SKU"))
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.starts_with("ACR SKU: expected values to be equal"), "{rendered}");
        assert!(rendered.contains("expected: Standard"));
        assert!(rendered.contains("actual:   nil"));
        assert!(err.diff().is_none());
    }

    #[test]
    fn multi_line_equality_failures_carry_a_diff() {
        let err = Validator::new(ComparisonKind::Equal, "a\nb")
            .check(&text("a\nc"), None)
            .unwrap_err();
        let diff = err.diff().expect("diff for multi-line values");
        assert!(diff.contains("-b"));
        assert!(diff.contains("+c"));

        let as_error: &dyn std::error::Error = &err;
        assert!(as_error.to_string().ends_with(&diff));
        assert!(as_error.source().is_none());
    }

    #[test]
    fn kinds_deserialize_from_snake_case() {
        let kind: ComparisonKind = serde_json::from_str("\"elements_match\"").unwrap();
        assert_eq!(kind, ComparisonKind::ElementsMatch);
        assert_eq!(ComparisonKind::default(), ComparisonKind::Equal);
    }

    #[test]
    fn wildcard_matches_ignore_insertion_order() {
        let tags = |pairs: [(&str, &str); 3]| {
            let map: Map<String, Value> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), json!(v)))
                .collect();
            json!({ "tags": map })
        };
        let first = tags([("env", "test"), ("owner", "sas"), ("cost_center", "42")]);
        let second = tags([("cost_center", "42"), ("env", "test"), ("owner", "sas")]);

        let validator = Validator::new(ComparisonKind::ElementsMatch, ["sas", "42", "test"]);
        for resource in [&first, &second] {
            let actual = extract(resource, "{$.tags.*}").unwrap();
            assert!(validator.check(&text(&actual), None).is_ok(), "{actual}");
        }

        let replicas = |order: [&str; 2]| json!({ "georeplications": order.map(|l| json!({ "location": l })) });
        let validator = Validator::new(ComparisonKind::ElementsMatch, ["southeastus3", "southeastus5"]);
        for resource in [replicas(["southeastus5", "southeastus3"]), replicas(["southeastus3", "southeastus5"])] {
            let actual = extract(&resource, "{$.georeplications[*].location}").unwrap();
            assert!(validator.check(&text(&actual), None).is_ok(), "{actual}");
        }

        let short = Validator::new(ComparisonKind::ElementsMatch, ["sas", "test"]);
        let actual = extract(&first, "{$.tags.*}").unwrap();
        assert!(short.check(&text(&actual), None).is_err());
    }
}
