//! VM directory backed by the Azure CLI.
//!
//! Maps `az vm list` and `az network nic show` output to [`Vm`] and [`NsgRef`].

use super::{cli, AzCli, VmDirectory};
use crate::config;
use crate::error::{FwError, Result};
use crate::models::{name_from_id, resource_group_from_id, NsgRef, Vm};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AzVm {
    name: String,
    id: String,
    resource_group: Option<String>,
    location: String,
    network_profile: Option<AzNetworkProfile>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AzNetworkProfile {
    network_interfaces: Option<Vec<AzIdRef>>,
}

#[derive(Deserialize, Debug)]
struct AzIdRef {
    id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AzNic {
    network_security_group: Option<AzIdRef>,
}

impl TryFrom<AzVm> for Vm {
    type Error = FwError;

    fn try_from(vm: AzVm) -> Result<Vm> {
        let resource_group = match vm.resource_group {
            Some(rg) => rg,
            None => resource_group_from_id(&vm.id)?,
        };
        let nic_ids = vm
            .network_profile
            .and_then(|p| p.network_interfaces)
            .unwrap_or_default()
            .into_iter()
            .map(|nic| nic.id)
            .collect();
        Ok(Vm {
            name: vm.name,
            id: vm.id,
            resource_group,
            location: vm.location,
            nic_ids,
        })
    }
}

/// Parse `az vm list` output.
pub fn parse_vm_list(json: &str) -> Result<Vec<Vm>> {
    let vms: Vec<AzVm> = cli::parse_json(json, "az vm list")?;
    vms.into_iter().map(Vm::try_from).collect()
}

/// Parse `az network nic show` output, returning the attached NSG if any.
pub fn parse_nic_nsg(json: &str) -> Result<Option<NsgRef>> {
    let nic: AzNic = cli::parse_json(json, "az network nic show")?;
    nic.network_security_group
        .map(|nsg| NsgRef::from_id(&nsg.id))
        .transpose()
}

impl VmDirectory for AzCli {
    fn list_vms(&self) -> Result<Vec<Vm>> {
        let output = cli::run(&format!(
            "az vm list {sub} --output json",
            sub = self.subscription_arg()
        ))?;
        let vms = parse_vm_list(&output)?;
        log::info!("Got {} VMs from az vm list", vms.len());
        Ok(vms)
    }

    fn nsgs_for_vm(&self, vm: &Vm) -> Result<Vec<NsgRef>> {
        let mut nsgs: Vec<NsgRef> = Vec::new();
        for nic_id in &vm.nic_ids {
            let nic_name = name_from_id(nic_id)?;
            let output = cli::run(&format!(
                "az network nic show --ids {nic_id} {sub} --output json",
                sub = self.subscription_arg()
            ))?;
            match parse_nic_nsg(&output)? {
                Some(nsg) => {
                    log::debug!("VM {} NIC {nic_name} -> NSG {nsg}", vm.name);
                    if !nsgs.iter().any(|n| n.id.eq_ignore_ascii_case(&nsg.id)) {
                        nsgs.push(nsg);
                    }
                }
                None => log::warn!("No Network Security Group associated with NIC: {nic_name}"),
            }
            std::thread::sleep(std::time::Duration::from_millis(config::SLEEP_MSEC));
        }
        Ok(nsgs)
    }
}
