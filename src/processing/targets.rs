//! Resolving "all VMs" or one named VM to (VM, NSG) pairs.

use crate::azure::VmDirectory;
use crate::error::{FwError, Result};
use crate::models::{Vm, VmTarget};

/// One entry of a selection, in VM order.
#[derive(Debug)]
pub enum Selected {
    Target(VmTarget),
    /// The VM could not be resolved to any NSG; other VMs are unaffected.
    Failed { vm: String, error: FwError },
}

/// VMs matching `vm_filter`, all VMs when `None`.
pub fn select_vms(dir: &dyn VmDirectory, vm_filter: Option<&str>) -> Result<Vec<Vm>> {
    let vms = dir.list_vms()?;
    match vm_filter {
        None => Ok(vms),
        Some(name) => {
            let matched: Vec<Vm> = vms.into_iter().filter(|vm| vm.name == name).collect();
            if matched.is_empty() {
                return Err(FwError::VmNotFound(name.to_string()));
            }
            Ok(matched)
        }
    }
}

/// Resolve the selected VMs to one target per distinct NSG.
///
/// Per-VM lookup problems become [`Selected::Failed`]; only errors that make
/// every other lookup fail too (see [`FwError::is_fatal`]) are returned.
pub fn select_targets(dir: &dyn VmDirectory, vm_filter: Option<&str>) -> Result<Vec<Selected>> {
    let mut selection = Vec::new();
    for vm in select_vms(dir, vm_filter)? {
        match dir.nsgs_for_vm(&vm) {
            Ok(nsgs) if nsgs.is_empty() => {
                log::warn!("VM {} has no network security group", vm.name);
                selection.push(Selected::Failed {
                    error: FwError::NoNsgFound {
                        vm: vm.name.clone(),
                    },
                    vm: vm.name,
                });
            }
            Ok(nsgs) => selection.extend(nsgs.into_iter().map(|nsg| {
                Selected::Target(VmTarget {
                    vm: vm.name.clone(),
                    nsg,
                })
            })),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Error resolving NSGs of VM {}: {e}", vm.name);
                selection.push(Selected::Failed {
                    vm: vm.name,
                    error: e,
                });
            }
        }
    }
    Ok(selection)
}
