//! Expected plan failures.

use std::fmt;

use plancheck_plan::PlanError;

use crate::error::CacheError;

/// How a planning attempt is expected to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorExpectation {
    /// Any failure will do.
    Any,
    /// The failure text must contain this fragment.
    Contains(String),
}

impl ErrorExpectation {
    #[must_use]
    pub fn contains(fragment: impl Into<String>) -> Self {
        Self::Contains(fragment.into())
    }

    /// Whether `error` is the expected failure. Tool failures are matched on
    /// the tool's diagnostics, anything else on its rendered message.
    #[must_use]
    pub fn matches(&self, error: &PlanError) -> bool {
        match self {
            Self::Any => true,
            Self::Contains(fragment) => {
                error.tool_output().is_some_and(|out| out.contains(fragment.as_str()))
                    || error.to_string().contains(fragment.as_str())
            }
        }
    }

    /// Check the result of a planning attempt.
    pub fn check<T>(&self, result: Result<T, CacheError>) -> Result<(), String> {
        match result {
            Ok(_) => Err(format!("planning succeeded, expected {self}")),
            Err(e) if self.matches(e.plan_error()) => Ok(()),
            Err(e) => Err(format!("expected {self}, got: {e}")),
        }
    }

    /// Panic unless `result` is the expected failure.
    #[track_caller]
    pub fn assert<T>(&self, result: Result<T, CacheError>) {
        if let Err(message) = self.check(result) {
            panic!("{message}");
        }
    }
}

impl fmt::Display for ErrorExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("a planning error"),
            Self::Contains(fragment) => write!(f, "an error containing {fragment:?}"),
        }
    }
}
