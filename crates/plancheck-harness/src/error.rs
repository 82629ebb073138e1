//! Harness error types.

use std::sync::Arc;

use plancheck_plan::PlanError;
use thiserror::Error;

use crate::compare::ComparisonMismatch;

/// A value could not be retrieved for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("invalid query `{query}`: {reason}")]
    Parse { query: String, reason: String },
    #[error("retrieval from `{identifier}` failed: {reason}")]
    Retrieval { identifier: String, reason: String },
}

impl ExtractionError {
    pub(crate) fn parse(query: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a single case did not pass.
#[derive(Debug, Clone, Error)]
pub enum CaseFailure {
    #[error("retrieval failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Mismatch(#[from] ComparisonMismatch),
    #[error("case panicked: {0}")]
    Panicked(String),
}

/// Plan generation failed inside the cache; shared by every waiter on the key.
#[derive(Debug, Clone, Error)]
#[error("plan for `{key}` failed: {source}")]
pub struct CacheError {
    pub key: String,
    pub source: Arc<PlanError>,
}

impl CacheError {
    /// The underlying plan error.
    #[must_use]
    pub fn plan_error(&self) -> &PlanError {
        &self.source
    }
}
