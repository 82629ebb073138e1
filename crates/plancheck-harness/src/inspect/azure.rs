//! Azure resource documents as returned by `az ... --output json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    pub provisioning_state: Option<String>,
}

/// `az vm show` output; the CLI flattens the ARM `properties` block into the
/// top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub priority: Option<String>,
    pub hardware_profile: Option<HardwareProfile>,
    pub os_profile: Option<OsProfile>,
    pub storage_profile: Option<StorageProfile>,
    pub network_profile: Option<NetworkProfile>,
    pub additional_capabilities: Option<AdditionalCapabilities>,
    pub instance_view: Option<InstanceView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub vm_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub admin_username: Option<String>,
    pub computer_name: Option<String>,
    pub allow_extension_operations: Option<bool>,
    pub linux_configuration: Option<LinuxConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxConfiguration {
    pub disable_password_authentication: Option<bool>,
    #[serde(rename = "provisionVMAgent")]
    pub provision_vm_agent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub os_disk: Option<OsDisk>,
    pub image_reference: Option<ImageReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    pub name: Option<String>,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<i64>,
    pub write_accelerator_enabled: Option<bool>,
    pub managed_disk: Option<ManagedDisk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDisk {
    pub id: Option<String>,
    pub storage_account_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    pub offer: Option<String>,
    pub publisher: Option<String>,
    pub sku: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub network_interfaces: Option<Vec<NetworkInterfaceReference>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceReference {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalCapabilities {
    #[serde(rename = "ultraSSDEnabled")]
    pub ultra_ssd_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    pub platform_fault_domain: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_az_vm_show_output() {
        let vm: VirtualMachine = serde_json::from_str(
            r#"{
                "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/default-nfs-vm",
                "name": "default-nfs-vm",
                "location": "eastus",
                "priority": "Regular",
                "hardwareProfile": {"vmSize": "Standard_D4s_v5"},
                "osProfile": {
                    "adminUsername": "nfsuser",
                    "computerName": "default-nfs-vm",
                    "allowExtensionOperations": true,
                    "linuxConfiguration": {"disablePasswordAuthentication": true, "provisionVMAgent": true}
                },
                "storageProfile": {
                    "osDisk": {"name": "disk0", "diskSizeGB": 64, "writeAcceleratorEnabled": false,
                               "managedDisk": {"id": "/disks/disk0", "storageAccountType": "Standard_LRS"}},
                    "imageReference": {"offer": "0001-com-ubuntu-server-focal", "publisher": "Canonical", "sku": "20_04-lts", "version": "latest"}
                },
                "networkProfile": {"networkInterfaces": [{"id": "/nics/nic0"}]},
                "additionalCapabilities": {"ultraSSDEnabled": false},
                "tags": {"ignored": "yes"}
            }"#,
        )
        .unwrap();
        assert_eq!(vm.hardware_profile.unwrap().vm_size.as_deref(), Some("Standard_D4s_v5"));
        let linux = vm.os_profile.unwrap().linux_configuration.unwrap();
        assert_eq!(linux.provision_vm_agent, Some(true));
        assert_eq!(vm.storage_profile.unwrap().os_disk.unwrap().disk_size_gb, Some(64));
        assert!(vm.instance_view.is_none());
    }
}
