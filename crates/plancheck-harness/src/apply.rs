//! Post-apply cases: both sides may be computed when the case runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use plancheck_plan::Plan;

use crate::compare::{ComparisonKind, Operand, Validator};
use crate::error::{CaseFailure, ExtractionError};
use crate::extract::{ABSENT, Query};
use crate::report::SuiteReport;
use crate::runner::{Evaluation, TestRunner, panicked};

type Retrieve = Arc<dyn Fn() -> Result<Operand, ExtractionError> + Send + Sync>;

/// One side of an [`ApplyTestCase`].
#[derive(Clone)]
pub enum Source {
    Value(Operand),
    Retrieve(Retrieve),
}

impl Source {
    pub fn value(value: impl Into<Operand>) -> Self {
        Self::Value(value.into())
    }

    pub fn retrieve<F>(f: F) -> Self
    where
        F: Fn() -> Operand + Send + Sync + 'static,
    {
        Self::try_retrieve(move || Ok(f()))
    }

    /// A source whose retrieval can fail; the error fails the case.
    pub fn try_retrieve<F>(f: F) -> Self
    where
        F: Fn() -> Result<Operand, ExtractionError> + Send + Sync + 'static,
    {
        Self::Retrieve(Arc::new(f))
    }

    /// A source computed as text, e.g. an accessor over a live resource.
    pub fn text<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::retrieve(move || Operand::Text(f()))
    }

    pub fn resolve(&self) -> Result<Operand, ExtractionError> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Retrieve(f) => f(),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Retrieve(_) => f.write_str("Retrieve(..)"),
        }
    }
}

/// Compares two sources after an apply.
#[derive(Debug, Clone)]
pub struct ApplyTestCase {
    expected: Source,
    actual: Source,
    comparison: Option<ComparisonKind>,
    message: Option<String>,
}

impl ApplyTestCase {
    #[must_use]
    pub fn new(expected: Source, actual: Source) -> Self {
        Self {
            expected,
            actual,
            comparison: None,
            message: None,
        }
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
    pub fn comparison(&self) -> ComparisonKind {
        self.comparison.unwrap_or_default()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Resolve both sides and compare; returns the resolved expected value too.
    pub(crate) fn evaluate(&self) -> (Operand, Evaluation) {
        let expected = match self.expected.resolve() {
            Ok(expected) => expected,
            Err(e) => return (Operand::Text(String::new()), unresolved(e)),
        };
        let actual = match self.actual.resolve() {
            Ok(actual) => actual,
            Err(e) => return (expected, unresolved(e)),
        };
        let result = Validator::new(self.comparison(), expected.clone())
            .check(&actual, self.message())
            .map_err(CaseFailure::from);
        let evaluation = Evaluation {
            actual: Some(actual.to_string()),
            result,
        };
        (expected, evaluation)
    }
}

fn unresolved(e: ExtractionError) -> Evaluation {
    Evaluation {
        actual: None,
        result: Err(e.into()),
    }
}

/// Source that reads `path` from the planned resource at `address`, or
/// `nil` when the resource is absent. A malformed `path` fails the case.
#[must_use]
pub fn retrieve_from_plan(plan: Arc<Plan>, address: impl Into<String>, path: impl Into<String>) -> Source {
    let (address, path) = (address.into(), path.into());
    Source::try_retrieve(move || {
        let query = Query::parse(&path)?;
        let rendered = plan
            .resource_values(&address)
            .map_or_else(|| ABSENT.to_string(), |values| query.render(values));
        Ok(Operand::Text(rendered))
    })
}

/// Run one apply case.
pub fn run_apply_test(case: &ApplyTestCase) -> Result<(), CaseFailure> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| case.evaluate().1))
        .unwrap_or_else(|payload| panicked(payload.as_ref()))
        .result
}

/// Run a batch of named apply cases.
pub fn run_apply_tests(tests: &HashMap<String, ApplyTestCase>) -> SuiteReport {
    TestRunner::new("apply").run_apply(tests)
}
