//! Harness configuration from environment variables.
//!
//! | Variable                  | Meaning                                       |
//! |---------------------------|-----------------------------------------------|
//! | `PLANCHECK_MODE`          | `replay` (default), `live` or `record`        |
//! | `PLANCHECK_TERRAFORM_DIR` | module directory; required for live/record    |
//! | `PLANCHECK_TERRAFORM_BIN` | Terraform binary (default `terraform`)        |
//! | `PLANCHECK_FIXTURE_DIR`   | recorded plan directory                       |
//! | `PLANCHECK_LOG`           | optional JSONL evidence log path              |

use std::path::PathBuf;

use crate::driver::{PlanDriver, RecordingDriver, ReplayDriver, TerraformCli};
use crate::error::PlanError;

pub const ENV_MODE: &str = "PLANCHECK_MODE";
pub const ENV_TERRAFORM_DIR: &str = "PLANCHECK_TERRAFORM_DIR";
pub const ENV_TERRAFORM_BIN: &str = "PLANCHECK_TERRAFORM_BIN";
pub const ENV_FIXTURE_DIR: &str = "PLANCHECK_FIXTURE_DIR";
pub const ENV_LOG: &str = "PLANCHECK_LOG";

/// Where plans come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Serve recorded plans from the fixture directory.
    Replay,
    /// Run Terraform for every plan.
    Live,
    /// Run Terraform and write recordings.
    Record,
}

impl RunMode {
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "replay" => Some(Self::Replay),
            "live" => Some(Self::Live),
            "record" => Some(Self::Record),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::Live => "live",
            Self::Record => "record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub mode: RunMode,
    pub terraform_dir: Option<PathBuf>,
    pub terraform_bin: PathBuf,
    pub fixture_dir: PathBuf,
    pub log_path: Option<PathBuf>,
    /// Top-level module entries not copied into Terraform working dirs.
    pub exclude: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Replay,
            terraform_dir: None,
            terraform_bin: PathBuf::from("terraform"),
            fixture_dir: PathBuf::from("tests/fixtures/plans"),
            log_path: None,
            exclude: vec!["test".to_string(), "target".to_string()],
        }
    }
}

impl HarnessConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, PlanError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PlanError> {
        Self::default().overlay(lookup)
    }

    /// Overlay values found through `lookup` onto `self`.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PlanError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = non_empty(ENV_MODE) {
            self.mode = RunMode::from_str_loose(&raw).ok_or_else(|| {
                PlanError::Config(format!(
                    "{ENV_MODE}={raw} is not one of replay, live, record"
                ))
            })?;
        }
        if let Some(dir) = non_empty(ENV_TERRAFORM_DIR) {
            self.terraform_dir = Some(PathBuf::from(dir));
        }
        if let Some(bin) = non_empty(ENV_TERRAFORM_BIN) {
            self.terraform_bin = PathBuf::from(bin);
        }
        if let Some(dir) = non_empty(ENV_FIXTURE_DIR) {
            self.fixture_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty(ENV_LOG) {
            self.log_path = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Terraform driver for the configured module, for live and apply runs.
    pub fn terraform(&self) -> Result<TerraformCli, PlanError> {
        let dir = self.terraform_dir.as_ref().ok_or_else(|| {
            PlanError::Config(format!(
                "{ENV_TERRAFORM_DIR} must be set for {} mode",
                self.mode.as_str()
            ))
        })?;
        let cli = self
            .exclude
            .iter()
            .fold(TerraformCli::new(dir).with_binary(&self.terraform_bin), |cli, name| {
                cli.exclude(name.clone())
            });
        Ok(cli)
    }

    /// The plan driver selected by `mode`.
    pub fn driver(&self) -> Result<Box<dyn PlanDriver>, PlanError> {
        Ok(match self.mode {
            RunMode::Replay => Box::new(ReplayDriver::new(&self.fixture_dir)),
            RunMode::Live => Box::new(self.terraform()?),
            RunMode::Record => Box::new(RecordingDriver::new(self.terraform()?, &self.fixture_dir)),
        })
    }
}
