//! Terminal output for `--list`, `--dump` and run summaries.

use crate::models::{SecurityRule, Vm};
use crate::processing::{PlanAction, RunSummary, VmStatus};
use colored::Colorize;
use itertools::Itertools;

/// Format a value as a quoted, right-aligned field.
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

pub fn vm_list_lines(vms: &[Vm]) -> Vec<String> {
    vms.iter()
        .sorted_by(|a, b| (&a.resource_group, &a.name).cmp(&(&b.resource_group, &b.name)))
        .map(|vm| {
            format!(
                "- {name} {rg} {location}",
                name = format_field(&vm.name, 24),
                rg = format_field(format!("rg:{}", vm.resource_group), 28),
                location = format_field(&vm.location, 18),
            )
        })
        .collect()
}

pub fn print_vm_list(vms: &[Vm]) {
    println!("Available Virtual Machines:");
    for line in vm_list_lines(vms) {
        println!("{line}");
    }
}

/// One block per rule, inbound before outbound, by priority.
pub fn rule_lines(rules: &[SecurityRule]) -> Vec<String> {
    rules
        .iter()
        .sorted_by_key(|r| (r.direction, r.priority))
        .flat_map(|rule| {
            vec![
                format!("Rule: {}", rule.name),
                format!("  Direction: {}", rule.direction),
                format!("  Priority: {}", rule.priority),
                format!("  Protocol: {}", rule.protocol),
                format!("  Source Port Range: {}", rule.source_ports_display()),
                format!(
                    "  Destination Port Range: {}",
                    rule.destination_ports_display()
                ),
                format!("  Source Address Prefix: {}", rule.source_display()),
                format!("  Destination Address Prefix: {}", rule.destination_display()),
                format!("  Access: {}", rule.access),
                "-".repeat(40),
            ]
        })
        .collect()
}

pub fn print_rules_header(vm: &str, nsg: &str) {
    println!("\nFirewall rules for VM: {} (NSG {nsg})", vm.bold());
    println!("{}", "=".repeat(50));
}

pub fn print_rules(rules: &[SecurityRule]) {
    if rules.is_empty() {
        println!("  (no custom rules)");
    }
    for line in rule_lines(rules) {
        println!("{line}");
    }
}

fn action_verb(action: PlanAction) -> &'static str {
    match action {
        PlanAction::Create => "create",
        PlanAction::Update => "update",
        PlanAction::NoChangeNeeded => "keep",
    }
}

/// One line per outcome, colored by status.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    summary
        .outcomes
        .iter()
        .map(|o| {
            let nsg = o.nsg.as_deref().unwrap_or("-");
            match &o.status {
                VmStatus::Changed(r) => {
                    let mut line = format!(
                        "{} {} NSG {nsg}: {} -> {} (backup {})",
                        "CHANGED ".green(),
                        o.vm,
                        r.previous_ip.as_deref().unwrap_or("none"),
                        r.new_ip,
                        r.backup.as_deref().unwrap_or("-")
                    );
                    for w in &r.warnings {
                        line.push_str(&format!("\n         {} {w}", "warning:".yellow()));
                    }
                    line
                }
                VmStatus::Unchanged(r) => format!(
                    "{} {} NSG {nsg}: already allows {}",
                    "OK      ".normal(),
                    o.vm,
                    r.new_ip
                ),
                VmStatus::DryRun(r) => format!(
                    "{} {} NSG {nsg}: would {} rule {}: {} -> {}",
                    "DRY-RUN ".yellow(),
                    o.vm,
                    action_verb(r.action),
                    r.would_apply
                        .as_ref()
                        .map(|rule| rule.name.as_str())
                        .unwrap_or("-"),
                    r.previous_ip.as_deref().unwrap_or("none"),
                    r.new_ip
                ),
                VmStatus::Failed(e) => format!("{} {} NSG {nsg}: {e}", "FAILED  ".red(), o.vm),
            }
        })
        .collect()
}

pub fn print_summary(summary: &RunSummary) {
    for line in summary_lines(summary) {
        println!("{line}");
    }
    println!(
        "#{}# {} changed, {} unchanged, {} dry-run, {} failed, {} warnings",
        "SUMMARY".on_blue(),
        summary.changed(),
        summary.unchanged(),
        summary.dry_run(),
        summary.failed(),
        summary.warnings()
    );
}
