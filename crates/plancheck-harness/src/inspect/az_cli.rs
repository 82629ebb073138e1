//! Azure CLI backed inspector.

use std::path::PathBuf;
use std::process::Command;

use serde::de::DeserializeOwned;

use super::{CloudInspector, InspectError, ResourceGroup, VirtualMachine};

/// Markers `az` prints when the requested resource does not exist.
const NOT_FOUND_MARKERS: [&str; 3] = ["ResourceGroupNotFound", "ResourceNotFound", "could not be found"];

/// Runs `az` and decodes its JSON output. Authentication is whatever the
/// CLI is already logged in with.
#[derive(Debug, Clone)]
pub struct AzCliInspector {
    binary: PathBuf,
    subscription: Option<String>,
}

impl Default for AzCliInspector {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("az"),
            subscription: None,
        }
    }
}

impl AzCliInspector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    fn args(&self, base: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = base.iter().map(|s| (*s).to_string()).collect();
        args.extend(["--output".to_string(), "json".to_string()]);
        if let Some(subscription) = &self.subscription {
            args.extend(["--subscription".to_string(), subscription.clone()]);
        }
        args
    }

    /// Run `az` and decode stdout; `Ok(None)` when the resource is missing.
    fn query<T: DeserializeOwned>(&self, base: &[&str]) -> Result<Option<T>, InspectError> {
        let args = self.args(base);
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        tracing::info!(%command, "running az");
        let output = Command::new(&self.binary).args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if is_not_found(&stderr) {
                return Ok(None);
            }
            return Err(InspectError::Tool { command, stderr });
        }
        serde_json::from_slice(&output.stdout)
            .map(Some)
            .map_err(|source| InspectError::Json { command, source })
    }
}

fn is_not_found(stderr: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker))
}

impl CloudInspector for AzCliInspector {
    fn resource_group(&self, name: &str) -> Result<Option<ResourceGroup>, InspectError> {
        self.query(&["group", "show", "--name", name])
    }

    fn virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>, InspectError> {
        self.query(&["vm", "show", "--resource-group", resource_group, "--name", name])
    }

    fn list_virtual_machines(&self, resource_group: &str) -> Result<Vec<String>, InspectError> {
        let names: Option<Vec<String>> = self.query(&[
            "vm",
            "list",
            "--resource-group",
            resource_group,
            "--query",
            "[].name",
        ])?;
        Ok(names.unwrap_or_default())
    }
}
