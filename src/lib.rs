//! Keep SSH access to Azure VMs restricted to the operator's current public IP.
//!
//! The managed NSG rule of every targeted VM is created or updated so that it
//! allows port 22 from the current IP only. Every change is preceded by a full
//! NSG backup and followed by an audit log row.

pub mod args;
pub mod azure;
pub mod config;
pub mod error;
pub mod ip;
pub mod logging;
pub mod models;
pub mod output;
pub mod processing;
pub mod store;

use args::{Args, Mode};
use azure::{AzCli, NsgRuleStore, VmDirectory};
use colored::Colorize;
use config::{Config, RunContext};
use error::Result;
use processing::{ChangeApplier, Selected};
use store::{CsvAuditLog, FileBackupStore};

pub const EXIT_OK: u8 = 0;
/// At least one targeted VM failed.
pub const EXIT_TARGET_FAILED: u8 = 1;
/// The run could not start or was aborted.
pub const EXIT_FATAL: u8 = 2;

/// Print the rules of every selected (VM, NSG) pair.
///
/// Returns true when every pair could be dumped.
pub fn dump_rules(
    store: &dyn NsgRuleStore,
    dir: &dyn VmDirectory,
    vm_filter: Option<&str>,
) -> Result<bool> {
    let mut all_ok = true;
    for selected in processing::select_targets(dir, vm_filter)? {
        match selected {
            Selected::Target(target) => {
                output::print_rules_header(&target.vm, &target.nsg.name);
                match store.list_rules(&target.nsg) {
                    Ok(rules) => output::print_rules(&rules),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        all_ok = false;
                        println!("{} {e}", "Error:".red());
                    }
                }
            }
            Selected::Failed { vm, error } => {
                all_ok = false;
                output::print_rules_header(&vm, "-");
                println!("{} {error}", "Error:".red());
            }
        }
    }
    Ok(all_ok)
}

/// Run one invocation of the tool and return its exit code.
pub async fn run_cli(args: &Args, config: &Config) -> Result<u8> {
    let session = azure::check_session()?;
    let az = AzCli::new(Some(session.subscription_id.clone()));
    let vm_filter = args.vm.as_deref();

    let mode = args.mode();
    match mode {
        Mode::List => {
            let vms = processing::select_vms(&az, vm_filter)?;
            output::print_vm_list(&vms);
            Ok(EXIT_OK)
        }
        Mode::Dump => {
            if dump_rules(&az, &az, vm_filter)? {
                Ok(EXIT_OK)
            } else {
                Ok(EXIT_TARGET_FAILED)
            }
        }
        Mode::DryRun | Mode::Apply => {
            let current_ip = match config.ip_override {
                Some(ip) => {
                    log::info!("Using IP {ip} from the command line");
                    ip
                }
                None => ip::resolve_public_ip(&config.ip_url).await?,
            };
            let ctx = RunContext {
                session,
                current_ip,
                managed_rule: config.managed_rule.clone(),
                dry_run: mode == Mode::DryRun,
            };
            let backups = FileBackupStore::new(&config.backup_dir, config.timezone);
            let audit = CsvAuditLog::new(&config.audit_log, config.timezone);
            let applier = ChangeApplier::new(&az, &backups, &audit);

            let summary = processing::run(&ctx, &az, &applier, vm_filter)?;
            output::print_summary(&summary);
            if summary.has_failures() {
                Ok(EXIT_TARGET_FAILED)
            } else {
                Ok(EXIT_OK)
            }
        }
    }
}
