//! Plan generation errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid plan json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{command}` exited with {status}:\n{stderr}")]
    Tool {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("variable set has no `{0}` variable")]
    MissingVariable(&'static str),
    #[error("no recorded plan for `{key}` at {}", path.display())]
    FixtureMissing { key: String, path: PathBuf },
    #[error(
        "recorded plan for `{key}` was captured from variables {expected}, \
         current variables digest to {actual}; re-record with PLANCHECK_MODE=record"
    )]
    FixtureStale {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("unsupported recording version `{0}`")]
    FixtureVersion(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PlanError {
    /// Diagnostic text produced by the failing tool, when there is one.
    #[must_use]
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::Tool { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
