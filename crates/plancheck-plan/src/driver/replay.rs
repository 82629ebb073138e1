//! Recorded plan fixtures: capture once with Terraform, replay offline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::PlanDriver;
use crate::error::PlanError;
use crate::variables::VariableSet;

/// Schema version written into every recording.
pub const RECORDING_VERSION: &str = "v1";

/// What the plan attempt produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordedOutcome {
    /// `terraform show -json` output.
    Plan { show: Value },
    /// Terraform refused to plan.
    Error { command: String, stderr: String },
}

/// One recorded plan attempt for one variable set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPlan {
    pub version: String,
    /// Cache key of the variable set (its prefix).
    pub key: String,
    pub captured_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_sha256: Option<String>,
    pub outcome: RecordedOutcome,
}

impl RecordedPlan {
    #[must_use]
    pub fn new(vars: &VariableSet, outcome: RecordedOutcome) -> Self {
        Self {
            version: RECORDING_VERSION.to_string(),
            key: vars.cache_key(),
            captured_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            variables_sha256: Some(vars.digest()),
            outcome,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let recording: Self = serde_json::from_str(json)?;
        if recording.version != RECORDING_VERSION {
            return Err(PlanError::FixtureVersion(recording.version));
        }
        Ok(recording)
    }

    pub fn from_file(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fail unless the recording was captured from exactly `vars`.
    pub fn check_variables(&self, vars: &VariableSet) -> Result<(), PlanError> {
        let actual = vars.digest();
        if self.variables_sha256.as_deref() == Some(actual.as_str()) {
            return Ok(());
        }
        Err(PlanError::FixtureStale {
            key: self.key.clone(),
            expected: self
                .variables_sha256
                .clone()
                .unwrap_or_else(|| "<unrecorded>".to_string()),
            actual,
        })
    }

    /// Turn the recording back into the driver result it captured.
    pub fn replay(self) -> Result<Value, PlanError> {
        match self.outcome {
            RecordedOutcome::Plan { show } => Ok(show),
            RecordedOutcome::Error { command, stderr } => Err(PlanError::Tool {
                command,
                status: "recorded failure".to_string(),
                stderr,
            }),
        }
    }
}

/// `<dir>/<key>.plan.json`, with path-hostile characters in the key replaced.
#[must_use]
pub fn recording_path(dir: &Path, key: &str) -> PathBuf {
    let file: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    dir.join(format!("{file}.plan.json"))
}

/// Serves plans from recordings keyed by the variable set's cache key.
///
/// A recording is only served to the exact variable set it was captured
/// from; any other set under the same key is [`PlanError::FixtureStale`].
#[derive(Debug, Clone)]
pub struct ReplayDriver {
    dir: PathBuf,
}

impl ReplayDriver {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PlanDriver for ReplayDriver {
    fn show_json(&self, vars: &VariableSet) -> Result<Value, PlanError> {
        let key = vars.cache_key();
        let path = recording_path(&self.dir, &key);
        if !path.is_file() {
            return Err(PlanError::FixtureMissing { key, path });
        }
        tracing::debug!(%key, path = %path.display(), "replaying recorded plan");
        let recording = RecordedPlan::from_file(&path)?;
        recording.check_variables(vars)?;
        recording.replay()
    }
}

/// Wraps another driver and records each plan or tool failure it produces.
#[derive(Debug, Clone)]
pub struct RecordingDriver<D> {
    inner: D,
    dir: PathBuf,
}

impl<D: PlanDriver> RecordingDriver<D> {
    #[must_use]
    pub fn new(inner: D, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    fn write(&self, recording: &RecordedPlan) -> Result<(), PlanError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = recording_path(&self.dir, &recording.key);
        std::fs::write(&path, recording.to_json()?)?;
        tracing::info!(path = %path.display(), "recorded plan");
        Ok(())
    }
}

impl<D: PlanDriver> PlanDriver for RecordingDriver<D> {
    fn show_json(&self, vars: &VariableSet) -> Result<Value, PlanError> {
        let result = self.inner.show_json(vars);
        let outcome = match &result {
            Ok(show) => Some(RecordedOutcome::Plan { show: show.clone() }),
            Err(PlanError::Tool {
                command, stderr, ..
            }) => Some(RecordedOutcome::Error {
                command: command.clone(),
                stderr: stderr.clone(),
            }),
            Err(_) => None,
        };
        if let Some(outcome) = outcome {
            self.write(&RecordedPlan::new(vars, outcome))?;
        }
        result
    }
}
