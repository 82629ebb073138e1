//! Live cloud inspection after an apply.
//!
//! [`CloudInspector`] fetches deployed resources as typed structs; the
//! [`accessors`] functions render one field each as canonical text so the
//! values can feed an [`ApplyTestCase`](crate::ApplyTestCase).

pub mod accessors;
mod az_cli;
mod azure;

pub use az_cli::AzCliInspector;
pub use azure::{
    AdditionalCapabilities, HardwareProfile, ImageReference, InstanceView, LinuxConfiguration,
    ManagedDisk, NetworkInterfaceReference, NetworkProfile, OsDisk, OsProfile, ResourceGroup,
    ResourceGroupProperties, StorageProfile, VirtualMachine,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response from `{command}`: {source}")]
    Json {
        command: String,
        source: serde_json::Error,
    },
    #[error("`{command}` failed: {stderr}")]
    Tool { command: String, stderr: String },
}

/// Reads deployed resources. Lookups of resources that do not exist return
/// `Ok(None)` rather than an error.
pub trait CloudInspector: Send + Sync {
    fn resource_group(&self, name: &str) -> Result<Option<ResourceGroup>, InspectError>;

    fn virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>, InspectError>;

    /// Names of the virtual machines in `resource_group`.
    fn list_virtual_machines(&self, resource_group: &str) -> Result<Vec<String>, InspectError>;
}
