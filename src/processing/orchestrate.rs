//! Runs the change applier over every selected (VM, NSG) pair.
//!
//! Pairs are processed one after another. A failing pair is recorded and the
//! run continues; only a lost session aborts it.

use super::apply::{ApplyResult, ChangeApplier};
use super::targets::{select_targets, Selected};
use crate::azure::VmDirectory;
use crate::config::RunContext;
use crate::error::{FwError, Result};

#[derive(Debug)]
pub enum VmStatus {
    Changed(ApplyResult),
    Unchanged(ApplyResult),
    DryRun(ApplyResult),
    Failed(FwError),
}

#[derive(Debug)]
pub struct VmOutcome {
    pub vm: String,
    /// `None` when the VM never got as far as an NSG.
    pub nsg: Option<String>,
    pub status: VmStatus,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<VmOutcome>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&VmStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn changed(&self) -> usize {
        self.count(|s| matches!(s, VmStatus::Changed(_)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|s| matches!(s, VmStatus::Unchanged(_)))
    }

    pub fn dry_run(&self) -> usize {
        self.count(|s| matches!(s, VmStatus::DryRun(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, VmStatus::Failed(_)))
    }

    pub fn warnings(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.status {
                VmStatus::Changed(r) => r.warnings.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

fn outcome_of(result: ApplyResult) -> VmOutcome {
    let vm = result.vm.clone();
    let nsg = Some(result.nsg.name.clone());
    let status = if !result.changed {
        VmStatus::Unchanged(result)
    } else if result.dry_run {
        VmStatus::DryRun(result)
    } else {
        VmStatus::Changed(result)
    };
    VmOutcome { vm, nsg, status }
}

/// Apply `ctx` to an already resolved selection.
pub fn run_selection(
    ctx: &RunContext,
    selection: Vec<Selected>,
    applier: &ChangeApplier<'_>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for selected in selection {
        let outcome = match selected {
            Selected::Failed { vm, error } => VmOutcome {
                vm,
                nsg: None,
                status: VmStatus::Failed(error),
            },
            Selected::Target(target) => match applier.apply(ctx, &target) {
                Ok(result) => outcome_of(result),
                Err(e) if e.is_fatal() => {
                    log::error!("Aborting run at VM {} NSG {}: {e}", target.vm, target.nsg);
                    return Err(e);
                }
                Err(e) => {
                    log::error!("VM {} NSG {}: {e}", target.vm, target.nsg);
                    VmOutcome {
                        vm: target.vm,
                        nsg: Some(target.nsg.name),
                        status: VmStatus::Failed(e),
                    }
                }
            },
        };
        summary.outcomes.push(outcome);
    }
    log::info!(
        "Run finished: {} changed, {} unchanged, {} dry-run, {} failed",
        summary.changed(),
        summary.unchanged(),
        summary.dry_run(),
        summary.failed()
    );
    Ok(summary)
}

/// Select targets from `dir` and apply `ctx` to each of them.
pub fn run(
    ctx: &RunContext,
    dir: &dyn VmDirectory,
    applier: &ChangeApplier<'_>,
    vm_filter: Option<&str>,
) -> Result<RunSummary> {
    let selection = select_targets(dir, vm_filter)?;
    run_selection(ctx, selection, applier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagedRule;
    use crate::error::CloudErrorKind;
    use crate::models::{NsgRef, Session, Vm};
    use crate::store::memory::{
        MemoryAuditLog, MemoryBackupStore, MemoryNsgStore, StaticVmDirectory,
    };

    fn vm(name: &str) -> Vm {
        Vm {
            name: name.to_string(),
            id: format!("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/{name}"),
            resource_group: "rg".to_string(),
            location: "australiaeast".to_string(),
            nic_ids: vec![],
        }
    }

    fn nsg(name: &str) -> NsgRef {
        NsgRef::from_id(&format!(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/{name}"
        ))
        .unwrap()
    }

    fn ctx(dry_run: bool) -> RunContext {
        RunContext {
            session: Session::default(),
            current_ip: "203.0.113.5".parse().unwrap(),
            managed_rule: ManagedRule::default(),
            dry_run,
        }
    }

    fn three_vms() -> StaticVmDirectory {
        StaticVmDirectory::new()
            .with_vm(vm("vm1"), vec![nsg("nsg1")])
            .with_vm(vm("vm2"), vec![nsg("nsg2")])
            .with_vm(vm("vm3"), vec![nsg("nsg3")])
    }

    #[test]
    fn test_partial_failure_isolation() {
        let store = MemoryNsgStore::new();
        store.fail_reads(&nsg("nsg2"), CloudErrorKind::Transient);
        let backups = MemoryBackupStore::new();
        let audit = MemoryAuditLog::new();
        let applier = ChangeApplier::new(&store, &backups, &audit);

        let summary = run(&ctx(false), &three_vms(), &applier, None).unwrap();
        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.changed(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(summary.has_failures());
        assert!(matches!(summary.outcomes[1].status, VmStatus::Failed(FwError::ReadFailed { .. })));
        assert_eq!(store.rules(&nsg("nsg1")).len(), 1);
        assert_eq!(store.rules(&nsg("nsg3")).len(), 1);
        assert_eq!(audit.records.borrow().len(), 2);
    }

    #[test]
    fn test_auth_failure_aborts_run() {
        let store = MemoryNsgStore::new();
        store.fail_reads(&nsg("nsg2"), CloudErrorKind::Auth);
        let backups = MemoryBackupStore::new();
        let audit = MemoryAuditLog::new();
        let applier = ChangeApplier::new(&store, &backups, &audit);

        let err = run(&ctx(false), &three_vms(), &applier, None).unwrap_err();
        assert!(err.is_fatal());
        // vm3 was never attempted
        assert!(store.rules(&nsg("nsg3")).is_empty());
        assert_eq!(store.reads.get(), 2);
    }

    #[test]
    fn test_no_nsg_vm_reported_and_skipped() {
        let dir = three_vms().with_vm(vm("vm4"), vec![]);
        let store = MemoryNsgStore::new();
        let backups = MemoryBackupStore::new();
        let audit = MemoryAuditLog::new();
        let applier = ChangeApplier::new(&store, &backups, &audit);

        let summary = run(&ctx(false), &dir, &applier, None).unwrap();
        assert_eq!(summary.changed(), 3);
        let last = summary.outcomes.last().unwrap();
        assert_eq!(last.vm, "vm4");
        assert!(last.nsg.is_none());
        assert!(matches!(last.status, VmStatus::Failed(FwError::NoNsgFound { .. })));
    }

    #[test]
    fn test_dry_run_then_apply_then_rerun() {
        let store = MemoryNsgStore::new();
        let backups = MemoryBackupStore::new();
        let audit = MemoryAuditLog::new();
        let applier = ChangeApplier::new(&store, &backups, &audit);

        let summary = run(&ctx(true), &three_vms(), &applier, Some("vm1")).unwrap();
        assert_eq!(summary.dry_run(), 1);
        assert_eq!(store.writes.get(), 0);

        let summary = run(&ctx(false), &three_vms(), &applier, Some("vm1")).unwrap();
        assert_eq!(summary.changed(), 1);

        let summary = run(&ctx(false), &three_vms(), &applier, Some("vm1")).unwrap();
        assert_eq!(summary.unchanged(), 1);
        assert!(!summary.has_failures());
        assert_eq!(backups.calls.get(), 1);
    }

    #[test]
    fn test_shared_nsg_written_once() {
        let shared = nsg("shared-nsg");
        let dir = StaticVmDirectory::new()
            .with_vm(vm("vm1"), vec![shared.clone()])
            .with_vm(vm("vm2"), vec![shared.clone()]);
        let store = MemoryNsgStore::new();
        let backups = MemoryBackupStore::new();
        let audit = MemoryAuditLog::new();
        let applier = ChangeApplier::new(&store, &backups, &audit);

        let summary = run(&ctx(false), &dir, &applier, None).unwrap();
        assert_eq!(summary.changed(), 1);
        assert_eq!(summary.unchanged(), 1);
        assert_eq!(store.writes.get(), 1);
    }
}
