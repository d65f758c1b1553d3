//! NSG rule store backed by the Azure CLI.

use super::{cli, AzCli, NsgRuleStore};
use crate::error::Result;
use crate::models::{AsgRef, NsgRef, SecurityRule};

/// Parse `az network nsg rule list` output.
pub fn parse_rule_list(json: &str, nsg: &NsgRef) -> Result<Vec<SecurityRule>> {
    cli::parse_json(json, &format!("az network nsg rule list ({nsg})"))
}

/// Values for a `--*-prefixes`/`--*-ranges` argument, list form first.
fn multi_value(single: &Option<String>, list: &[String]) -> Vec<String> {
    if list.is_empty() {
        vec![single.clone().unwrap_or_else(|| "*".to_string())]
    } else {
        list.to_vec()
    }
}

/// `--*-asgs ids` when the rule uses ASGs, else `--*-address-prefixes values`.
fn address_args(
    side: &str,
    single: &Option<String>,
    list: &[String],
    asgs: &[AsgRef],
) -> Vec<String> {
    if asgs.is_empty() {
        let mut args = vec![format!("--{side}-address-prefixes")];
        args.extend(multi_value(single, list));
        args
    } else {
        let mut args = vec![format!("--{side}-asgs")];
        args.extend(asgs.iter().map(|asg| asg.id.clone()));
        args
    }
}

/// Build the `az network nsg rule create` argument vector for `rule`.
///
/// `rule create` replaces a rule of the same name, so this covers both create
/// and update. Every address and port field is passed in the form it was read.
pub fn rule_create_args(
    nsg: &NsgRef,
    rule: &SecurityRule,
    subscription: Option<&str>,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "az", "network", "nsg", "rule", "create", "--resource-group",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.extend([
        nsg.resource_group.clone(),
        "--nsg-name".to_string(),
        nsg.name.clone(),
        "--name".to_string(),
        rule.name.clone(),
        "--priority".to_string(),
        rule.priority.to_string(),
        "--direction".to_string(),
        rule.direction.to_string(),
        "--access".to_string(),
        rule.access.to_string(),
        "--protocol".to_string(),
        rule.protocol.to_string(),
    ]);
    args.extend(address_args(
        "source",
        &rule.source_address_prefix,
        &rule.source_address_prefixes,
        &rule.source_application_security_groups,
    ));
    args.push("--source-port-ranges".to_string());
    args.extend(multi_value(&rule.source_port_range, &rule.source_port_ranges));
    args.extend(address_args(
        "destination",
        &rule.destination_address_prefix,
        &rule.destination_address_prefixes,
        &rule.destination_application_security_groups,
    ));
    args.push("--destination-port-ranges".to_string());
    args.extend(multi_value(&rule.destination_port_range, &rule.destination_port_ranges));
    if let Some(description) = &rule.description {
        args.push("--description".to_string());
        args.push(description.clone());
    }
    if let Some(sub) = subscription {
        args.push("--subscription".to_string());
        args.push(sub.to_string());
    }
    args.push("--output".to_string());
    args.push("none".to_string());
    args
}

impl NsgRuleStore for AzCli {
    fn list_rules(&self, nsg: &NsgRef) -> Result<Vec<SecurityRule>> {
        let output = cli::run(&format!(
            "az network nsg rule list --resource-group {rg} --nsg-name {name} {sub} --output json",
            rg = nsg.resource_group,
            name = nsg.name,
            sub = self.subscription_arg()
        ))
        .map_err(|e| e.into_read_failed(&nsg.name))?;
        let rules = parse_rule_list(&output, nsg)?;
        log::debug!("NSG {nsg} has {} custom rules", rules.len());
        Ok(rules)
    }

    fn write_rule(&self, nsg: &NsgRef, rule: &SecurityRule) -> Result<()> {
        let args = rule_create_args(nsg, rule, self.subscription.as_deref());
        cli::run_args(&args).map_err(|e| e.into_write_failed(&nsg.name))?;
        log::info!(
            "Wrote rule '{}' into NSG {nsg} source={}",
            rule.name,
            rule.source_display()
        );
        Ok(())
    }
}
