//! Plan drivers: the seam between the harness and whatever produces plans.
//!
//! The harness only needs a `terraform show -json` document per variable set.
//! [`TerraformCli`] produces it by running Terraform; [`ReplayDriver`] reads a
//! previously recorded document; [`RecordingDriver`] captures recordings from
//! any other driver.

mod replay;
mod terraform;

pub use replay::{
    RECORDING_VERSION, RecordedOutcome, RecordedPlan, RecordingDriver, ReplayDriver,
    recording_path,
};
pub use terraform::{Deployment, TerraformCli};

use serde_json::Value;

use crate::error::PlanError;
use crate::model::Plan;
use crate::variables::VariableSet;

/// Produces plans for variable sets.
pub trait PlanDriver: Send + Sync {
    /// The `terraform show -json` document for `vars`.
    fn show_json(&self, vars: &VariableSet) -> Result<Value, PlanError>;

    /// Parsed plan for `vars`.
    fn plan(&self, vars: &VariableSet) -> Result<Plan, PlanError> {
        Plan::from_show_value(self.show_json(vars)?)
    }
}

impl<D: PlanDriver + ?Sized> PlanDriver for Box<D> {
    fn show_json(&self, vars: &VariableSet) -> Result<Value, PlanError> {
        (**self).show_json(vars)
    }
}

impl<D: PlanDriver + ?Sized> PlanDriver for std::sync::Arc<D> {
    fn show_json(&self, vars: &VariableSet) -> Result<Value, PlanError> {
        (**self).show_json(vars)
    }
}
