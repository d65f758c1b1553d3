//! Azure CLI interaction.
//!
//! This module handles all Azure-related operations:
//! - [`cli`] - Command execution for Azure CLI
//! - [`session`] - Login check
//! - [`vm`] - VM and NIC lookup ([`VmDirectory`])
//! - [`nsg`] - Reading and writing NSG rules ([`NsgRuleStore`])

mod cli;
mod nsg;
mod session;
mod vm;

use crate::error::Result;
use crate::models::{NsgRef, SecurityRule, Vm};

// Re-export public types and functions
pub use cli::{classify_stderr, parse_json, run, run_args};
pub use nsg::{parse_rule_list, rule_create_args};
pub use session::{check_session, parse_account};
pub use vm::{parse_nic_nsg, parse_vm_list};

/// Reads and writes the security rules of one NSG.
pub trait NsgRuleStore {
    /// Custom (non-default) rules of `nsg`.
    fn list_rules(&self, nsg: &NsgRef) -> Result<Vec<SecurityRule>>;
    /// Create or replace `rule` in `nsg`, matched by rule name.
    fn write_rule(&self, nsg: &NsgRef, rule: &SecurityRule) -> Result<()>;
}

/// Enumerates VMs and the NSGs attached to their NICs.
pub trait VmDirectory {
    fn list_vms(&self) -> Result<Vec<Vm>>;
    /// Distinct NSGs across all NICs of `vm`, empty if none.
    fn nsgs_for_vm(&self, vm: &Vm) -> Result<Vec<NsgRef>>;
}

/// `az` based implementation of [`NsgRuleStore`] and [`VmDirectory`].
#[derive(Debug, Clone, Default)]
pub struct AzCli {
    /// Pin every call to this subscription, `None` uses the CLI default.
    pub subscription: Option<String>,
}

impl AzCli {
    pub fn new(subscription: Option<String>) -> AzCli {
        AzCli { subscription }
    }

    fn subscription_arg(&self) -> String {
        match &self.subscription {
            Some(sub) => format!("--subscription {sub}"),
            None => String::new(),
        }
    }
}
