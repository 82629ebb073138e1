//! One function per inspected field, each rendering canonical text.
//!
//! Missing values render as `nil`; booleans and numbers as `true` / `64`;
//! non-empty lists as `not nil`. Empty strings stay empty.

use crate::extract::ABSENT;

use super::{OsDisk, OsProfile, ResourceGroup, VirtualMachine};

fn text(value: Option<&String>) -> String {
    value.map_or_else(|| ABSENT.to_string(), Clone::clone)
}

fn flag(value: Option<bool>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

fn number(value: Option<i64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

fn presence<T>(items: Option<&Vec<T>>) -> String {
    match items {
        Some(items) if !items.is_empty() => "not nil".to_string(),
        _ => ABSENT.to_string(),
    }
}

pub fn group_id(group: &ResourceGroup) -> String {
    text(group.id.as_ref())
}

pub fn group_name(group: &ResourceGroup) -> String {
    text(group.name.as_ref())
}

pub fn group_location(group: &ResourceGroup) -> String {
    text(group.location.as_ref())
}

pub fn group_provisioning_state(group: &ResourceGroup) -> String {
    text(group.properties.as_ref().and_then(|p| p.provisioning_state.as_ref()))
}

pub fn vm_id(vm: &VirtualMachine) -> String {
    text(vm.id.as_ref())
}

pub fn vm_name(vm: &VirtualMachine) -> String {
    text(vm.name.as_ref())
}

pub fn vm_location(vm: &VirtualMachine) -> String {
    text(vm.location.as_ref())
}

pub fn vm_priority(vm: &VirtualMachine) -> String {
    text(vm.priority.as_ref())
}

pub fn vm_size(vm: &VirtualMachine) -> String {
    text(vm.hardware_profile.as_ref().and_then(|h| h.vm_size.as_ref()))
}

fn os_profile(vm: &VirtualMachine) -> Option<&OsProfile> {
    vm.os_profile.as_ref()
}

pub fn vm_admin_username(vm: &VirtualMachine) -> String {
    text(os_profile(vm).and_then(|os| os.admin_username.as_ref()))
}

pub fn vm_computer_name(vm: &VirtualMachine) -> String {
    text(os_profile(vm).and_then(|os| os.computer_name.as_ref()))
}

pub fn vm_allow_extension_operations(vm: &VirtualMachine) -> String {
    flag(os_profile(vm).and_then(|os| os.allow_extension_operations))
}

pub fn vm_disable_password_authentication(vm: &VirtualMachine) -> String {
    flag(
        os_profile(vm)
            .and_then(|os| os.linux_configuration.as_ref())
            .and_then(|linux| linux.disable_password_authentication),
    )
}

pub fn vm_provision_vm_agent(vm: &VirtualMachine) -> String {
    flag(
        os_profile(vm)
            .and_then(|os| os.linux_configuration.as_ref())
            .and_then(|linux| linux.provision_vm_agent),
    )
}

fn os_disk(vm: &VirtualMachine) -> Option<&OsDisk> {
    vm.storage_profile.as_ref().and_then(|s| s.os_disk.as_ref())
}

pub fn vm_os_disk_name(vm: &VirtualMachine) -> String {
    text(os_disk(vm).and_then(|d| d.name.as_ref()))
}

pub fn vm_os_disk_size_gb(vm: &VirtualMachine) -> String {
    number(os_disk(vm).and_then(|d| d.disk_size_gb))
}

pub fn vm_os_disk_write_accelerator_enabled(vm: &VirtualMachine) -> String {
    flag(os_disk(vm).and_then(|d| d.write_accelerator_enabled))
}

pub fn vm_managed_disk_id(vm: &VirtualMachine) -> String {
    text(os_disk(vm).and_then(|d| d.managed_disk.as_ref()).and_then(|m| m.id.as_ref()))
}

pub fn vm_os_disk_storage_account_type(vm: &VirtualMachine) -> String {
    text(
        os_disk(vm)
            .and_then(|d| d.managed_disk.as_ref())
            .and_then(|m| m.storage_account_type.as_ref()),
    )
}

pub fn vm_image_offer(vm: &VirtualMachine) -> String {
    text(image(vm).and_then(|i| i.offer.as_ref()))
}

pub fn vm_image_publisher(vm: &VirtualMachine) -> String {
    text(image(vm).and_then(|i| i.publisher.as_ref()))
}

pub fn vm_image_sku(vm: &VirtualMachine) -> String {
    text(image(vm).and_then(|i| i.sku.as_ref()))
}

pub fn vm_image_version(vm: &VirtualMachine) -> String {
    text(image(vm).and_then(|i| i.version.as_ref()))
}

fn image(vm: &VirtualMachine) -> Option<&super::ImageReference> {
    vm.storage_profile.as_ref().and_then(|s| s.image_reference.as_ref())
}

pub fn vm_network_interfaces(vm: &VirtualMachine) -> String {
    presence(vm.network_profile.as_ref().and_then(|n| n.network_interfaces.as_ref()))
}

pub fn vm_ultra_ssd_enabled(vm: &VirtualMachine) -> String {
    flag(vm.additional_capabilities.as_ref().and_then(|a| a.ultra_ssd_enabled))
}

pub fn vm_platform_fault_domain(vm: &VirtualMachine) -> String {
    number(vm.instance_view.as_ref().and_then(|i| i.platform_fault_domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{
        AdditionalCapabilities, HardwareProfile, ImageReference, LinuxConfiguration, ManagedDisk,
        NetworkInterfaceReference, NetworkProfile, StorageProfile,
    };

    fn nfs_vm() -> VirtualMachine {
        VirtualMachine {
            id: Some("ID".to_string()),
            location: Some("eastus".to_string()),
            priority: Some("Regular".to_string()),
            hardware_profile: Some(HardwareProfile {
                vm_size: Some("Standard_DS2_v2".to_string()),
            }),
            os_profile: Some(OsProfile {
                admin_username: Some("nfsuser".to_string()),
                computer_name: Some(String::new()),
                allow_extension_operations: Some(true),
                linux_configuration: Some(LinuxConfiguration {
                    disable_password_authentication: Some(true),
                    provision_vm_agent: Some(true),
                }),
            }),
            storage_profile: Some(StorageProfile {
                os_disk: Some(OsDisk {
                    name: Some("DiskName".to_string()),
                    disk_size_gb: Some(64),
                    write_accelerator_enabled: Some(false),
                    managed_disk: Some(ManagedDisk {
                        id: Some("ID".to_string()),
                        storage_account_type: Some("Standard_LRS".to_string()),
                    }),
                }),
                image_reference: Some(ImageReference {
                    offer: Some("0001-com-ubuntu-server-focal".to_string()),
                    publisher: Some("Canonical".to_string()),
                    sku: Some("20_04-lts".to_string()),
                    version: Some("latest".to_string()),
                }),
            }),
            network_profile: Some(NetworkProfile {
                network_interfaces: Some(vec![
                    NetworkInterfaceReference { id: Some("ID".to_string()) },
                    NetworkInterfaceReference { id: Some("ID".to_string()) },
                ]),
            }),
            additional_capabilities: Some(AdditionalCapabilities {
                ultra_ssd_enabled: Some(false),
            }),
            ..VirtualMachine::default()
        }
    }

    #[test]
    fn group_fields() {
        let group = ResourceGroup {
            id: Some("ID".to_string()),
            name: Some("Name".to_string()),
            location: Some("Location".to_string()),
            ..ResourceGroup::default()
        };
        assert_eq!(group_id(&group), "ID");
        assert_eq!(group_name(&group), "Name");
        assert_eq!(group_location(&group), "Location");
        assert_eq!(group_provisioning_state(&group), "nil");
    }

    #[test]
    fn vm_fields_render_canonically() {
        let vm = nfs_vm();
        assert_eq!(vm_admin_username(&vm), "nfsuser");
        assert_eq!(vm_allow_extension_operations(&vm), "true");
        assert_eq!(vm_computer_name(&vm), "");
        assert_eq!(vm_disable_password_authentication(&vm), "true");
        assert_eq!(vm_provision_vm_agent(&vm), "true");
        assert_eq!(vm_location(&vm), "eastus");
        assert_eq!(vm_network_interfaces(&vm), "not nil");
        assert_eq!(vm_priority(&vm), "Regular");
        assert_eq!(vm_size(&vm), "Standard_DS2_v2");
        assert_eq!(vm_ultra_ssd_enabled(&vm), "false");
        assert_eq!(vm_os_disk_size_gb(&vm), "64");
        assert_eq!(vm_managed_disk_id(&vm), "ID");
        assert_eq!(vm_os_disk_name(&vm), "DiskName");
        assert_eq!(vm_os_disk_storage_account_type(&vm), "Standard_LRS");
        assert_eq!(vm_os_disk_write_accelerator_enabled(&vm), "false");
        assert_eq!(vm_image_offer(&vm), "0001-com-ubuntu-server-focal");
        assert_eq!(vm_image_publisher(&vm), "Canonical");
        assert_eq!(vm_image_sku(&vm), "20_04-lts");
        assert_eq!(vm_image_version(&vm), "latest");
        assert_eq!(vm_platform_fault_domain(&vm), "nil");
    }

    #[test]
    fn missing_sections_render_nil() {
        let vm = VirtualMachine::default();
        assert_eq!(vm_admin_username(&vm), "nil");
        assert_eq!(vm_os_disk_size_gb(&vm), "nil");
        assert_eq!(vm_network_interfaces(&vm), "nil");
        let empty = VirtualMachine {
            network_profile: Some(NetworkProfile {
                network_interfaces: Some(Vec::new()),
            }),
            ..VirtualMachine::default()
        };
        assert_eq!(vm_network_interfaces(&empty), "nil");
    }
}
