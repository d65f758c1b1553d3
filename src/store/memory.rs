//! In-memory implementations of the cloud and storage seams.
//!
//! Every type counts its calls and can be told to fail, so the reconciliation
//! flow can be exercised without Azure or a filesystem.

use super::{AuditSink, BackupSink};
use crate::azure::{NsgRuleStore, VmDirectory};
use crate::error::{CloudErrorKind, FwError, Result};
use crate::models::{IpChangeRecord, NsgRef, NsgSnapshot, SecurityRule, Vm};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// NSG rule lists keyed by NSG id.
#[derive(Debug, Default)]
pub struct MemoryNsgStore {
    rules: RefCell<HashMap<String, Vec<SecurityRule>>>,
    failing_reads: RefCell<HashMap<String, CloudErrorKind>>,
    failing_writes: RefCell<HashMap<String, CloudErrorKind>>,
    pub reads: Cell<usize>,
    pub writes: Cell<usize>,
}

impl MemoryNsgStore {
    pub fn new() -> MemoryNsgStore {
        MemoryNsgStore::default()
    }

    pub fn insert(&self, nsg: &NsgRef, rules: Vec<SecurityRule>) {
        self.rules.borrow_mut().insert(nsg.id.clone(), rules);
    }

    pub fn rules(&self, nsg: &NsgRef) -> Vec<SecurityRule> {
        self.rules
            .borrow()
            .get(&nsg.id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_reads(&self, nsg: &NsgRef, kind: CloudErrorKind) {
        self.failing_reads.borrow_mut().insert(nsg.id.clone(), kind);
    }

    pub fn fail_writes(&self, nsg: &NsgRef, kind: CloudErrorKind) {
        self.failing_writes.borrow_mut().insert(nsg.id.clone(), kind);
    }
}

impl NsgRuleStore for MemoryNsgStore {
    fn list_rules(&self, nsg: &NsgRef) -> Result<Vec<SecurityRule>> {
        self.reads.set(self.reads.get() + 1);
        if let Some(kind) = self.failing_reads.borrow().get(&nsg.id) {
            return Err(FwError::ReadFailed {
                nsg: nsg.name.clone(),
                kind: *kind,
                message: "injected read failure".to_string(),
            });
        }
        Ok(self.rules(nsg))
    }

    fn write_rule(&self, nsg: &NsgRef, rule: &SecurityRule) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        if let Some(kind) = self.failing_writes.borrow().get(&nsg.id) {
            return Err(FwError::WriteFailed {
                nsg: nsg.name.clone(),
                kind: *kind,
                message: "injected write failure".to_string(),
            });
        }
        let mut all = self.rules.borrow_mut();
        let rules = all.entry(nsg.id.clone()).or_default();
        match rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule.clone(),
            None => rules.push(rule.clone()),
        }
        Ok(())
    }
}

/// Fixed set of VMs with their NSGs.
#[derive(Debug, Default)]
pub struct StaticVmDirectory {
    vms: Vec<Vm>,
    nsgs: HashMap<String, Vec<NsgRef>>,
    failing_vms: HashMap<String, CloudErrorKind>,
    list_failure: Option<CloudErrorKind>,
}

impl StaticVmDirectory {
    pub fn new() -> StaticVmDirectory {
        StaticVmDirectory::default()
    }

    /// Add a VM; an empty `nsgs` models a VM without any NSG.
    pub fn with_vm(mut self, vm: Vm, nsgs: Vec<NsgRef>) -> StaticVmDirectory {
        self.nsgs.insert(vm.name.clone(), nsgs);
        self.vms.push(vm);
        self
    }

    /// Make the NIC lookup of `vm_name` fail.
    pub fn with_failing_vm(mut self, vm_name: &str, kind: CloudErrorKind) -> StaticVmDirectory {
        self.failing_vms.insert(vm_name.to_string(), kind);
        self
    }

    /// Make listing VMs fail.
    pub fn with_list_failure(mut self, kind: CloudErrorKind) -> StaticVmDirectory {
        self.list_failure = Some(kind);
        self
    }
}

impl VmDirectory for StaticVmDirectory {
    fn list_vms(&self) -> Result<Vec<Vm>> {
        if let Some(kind) = self.list_failure {
            return Err(FwError::Cli {
                kind,
                message: "injected list failure".to_string(),
            });
        }
        Ok(self.vms.clone())
    }

    fn nsgs_for_vm(&self, vm: &Vm) -> Result<Vec<NsgRef>> {
        if let Some(kind) = self.failing_vms.get(&vm.name) {
            return Err(FwError::Cli {
                kind: *kind,
                message: format!("injected NIC lookup failure for {}", vm.name),
            });
        }
        Ok(self.nsgs.get(&vm.name).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    pub snapshots: RefCell<Vec<NsgSnapshot>>,
    pub fail: Cell<bool>,
    pub calls: Cell<usize>,
}

impl MemoryBackupStore {
    pub fn new() -> MemoryBackupStore {
        MemoryBackupStore::default()
    }
}

impl BackupSink for MemoryBackupStore {
    fn store(&self, snapshot: &NsgSnapshot) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        if self.fail.get() {
            return Err(FwError::BackupWriteFailed {
                nsg: snapshot.nsg.name.clone(),
                message: "injected backup failure".to_string(),
            });
        }
        let mut snapshots = self.snapshots.borrow_mut();
        snapshots.push(snapshot.clone());
        Ok(format!("memory:{}#{}", snapshot.nsg.name, snapshots.len()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    pub records: RefCell<Vec<IpChangeRecord>>,
    pub fail: Cell<bool>,
    pub calls: Cell<usize>,
}

impl MemoryAuditLog {
    pub fn new() -> MemoryAuditLog {
        MemoryAuditLog::default()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: &IpChangeRecord) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail.get() {
            return Err(FwError::LogWriteFailed {
                path: "memory".to_string(),
                message: "injected log failure".to_string(),
            });
        }
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
