//! Virtual machines, their NSGs, and the Azure session they are read through.

use crate::error::{FwError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extract the resource group name from an Azure resource id.
///
/// Azure is not consistent about the case of the `resourceGroups` segment.
pub fn resource_group_from_id(resource_id: &str) -> Result<String> {
    let parts: Vec<&str> = resource_id.split('/').collect();
    parts
        .iter()
        .position(|p| p.eq_ignore_ascii_case("resourceGroups"))
        .and_then(|i| parts.get(i + 1))
        .filter(|rg| !rg.is_empty())
        .map(|rg| rg.to_string())
        .ok_or_else(|| FwError::ResourceId(resource_id.to_string()))
}

/// Last segment of an Azure resource id.
pub fn name_from_id(resource_id: &str) -> Result<String> {
    resource_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .map(|n| n.to_string())
        .ok_or_else(|| FwError::ResourceId(resource_id.to_string()))
}

/// Identity of a network security group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NsgRef {
    pub id: String,
    pub name: String,
    pub resource_group: String,
}

impl NsgRef {
    pub fn from_id(id: &str) -> Result<NsgRef> {
        Ok(NsgRef {
            id: id.to_string(),
            name: name_from_id(id)?,
            resource_group: resource_group_from_id(id)?,
        })
    }
}

impl fmt::Display for NsgRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.name)
    }
}

/// A virtual machine as far as this tool cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vm {
    pub name: String,
    pub id: String,
    pub resource_group: String,
    pub location: String,
    pub nic_ids: Vec<String>,
}

/// One (VM, NSG) pair to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmTarget {
    pub vm: String,
    pub nsg: NsgRef,
}

/// Verified `az` login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub subscription_id: String,
    pub subscription_name: String,
    pub user: String,
}
