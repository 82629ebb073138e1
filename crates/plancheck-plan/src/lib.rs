//! Terraform plan model and plan drivers for plancheck.
//!
//! This crate provides:
//! - Plan model: `terraform show -json` parsed into address-keyed resource,
//!   variable, output and change maps
//! - Variable sets: `.tfvars.json` loading plus per-run overrides
//! - Plan drivers: live Terraform CLI, recorded-fixture replay, and recording
//! - Harness configuration read from the environment

#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod variables;

pub use config::{HarnessConfig, RunMode};
pub use driver::{PlanDriver, RecordingDriver, ReplayDriver, TerraformCli};
pub use error::PlanError;
pub use model::{Plan, PlanVariable, PlannedOutput, PlannedResource, ResourceChange};
pub use variables::{VariableSet, unique_prefix};
