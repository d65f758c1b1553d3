//! Integration tests for azure-ssh-firewall
//!
//! These tests drive a full run against in-memory Azure stand-ins and real
//! backup/audit files on disk.

use azure_ssh_firewall::config::{ManagedRule, RunContext};
use azure_ssh_firewall::models::{NsgRef, Session, Vm};
use azure_ssh_firewall::processing::{run, ChangeApplier, PlanAction, VmStatus};
use azure_ssh_firewall::store::memory::{MemoryNsgStore, StaticVmDirectory};
use azure_ssh_firewall::store::{load_snapshot, CsvAuditLog, FileBackupStore, AUDIT_HEADER};
use azure_ssh_firewall::{azure, dump_rules};
use chrono_tz::Tz;
use std::path::Path;

fn vm(name: &str) -> Vm {
    Vm {
        name: name.to_string(),
        id: format!("/subscriptions/0000-1111/resourceGroups/rg-web/providers/Microsoft.Compute/virtualMachines/{name}"),
        resource_group: "rg-web".to_string(),
        location: "australiaeast".to_string(),
        nic_ids: vec![],
    }
}

fn web_nsg() -> NsgRef {
    NsgRef::from_id("/subscriptions/0000-1111/resourceGroups/RG-WEB/providers/Microsoft.Network/networkSecurityGroups/web01-nsg")
        .expect("valid NSG id")
}

fn ctx(ip: &str) -> RunContext {
    RunContext {
        session: Session::default(),
        current_ip: ip.parse().expect("valid IP"),
        managed_rule: ManagedRule::default(),
        dry_run: false,
    }
}

#[test]
fn test_ip_change_with_files_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backup_dir = dir.path().join("nsg_backups");
    let log_file = dir.path().join("ip_log.csv");

    // start from the rules Azure reported in the sample
    let json = std::fs::read_to_string("src/tests/test_data/az_nsg_rule_list_01.json")
        .expect("Error reading test data");
    let read_rules = azure::parse_rule_list(&json, &web_nsg()).expect("parse rules");
    let store = MemoryNsgStore::new();
    store.insert(&web_nsg(), read_rules.clone());
    let directory = StaticVmDirectory::new().with_vm(vm("web01"), vec![web_nsg()]);
    let backups = FileBackupStore::new(&backup_dir, Tz::UTC);
    let audit = CsvAuditLog::new(&log_file, Tz::UTC);
    let applier = ChangeApplier::new(&store, &backups, &audit);

    // the sample already allows 203.0.113.5
    let summary = run(&ctx("203.0.113.5"), &directory, &applier, None).expect("run");
    assert_eq!(summary.unchanged(), 1);
    assert!(!backup_dir.exists(), "no backup without a change");
    assert!(!log_file.exists(), "no log row without a change");

    let summary = run(&ctx("203.0.113.9"), &directory, &applier, Some("web01")).expect("run");
    assert_eq!(summary.changed(), 1);
    let result = match &summary.outcomes[0].status {
        VmStatus::Changed(r) => r,
        other => panic!("unexpected status {other:?}"),
    };
    assert_eq!(result.action, PlanAction::Update);

    // backup holds the untouched rule list, list forms and Azure metadata included
    let backup_path = result.backup.as_deref().expect("backup path");
    let snapshot = load_snapshot(Path::new(backup_path)).expect("load backup");
    assert_eq!(snapshot.rules, read_rules);
    let raw = std::fs::read_to_string(backup_path).expect("read backup");
    assert!(raw.contains("10.0.0.4"));
    assert!(raw.contains("1024-2048"));
    assert!(raw.contains("app-asg"));
    assert!(raw.contains("securityRules/AllowAppTier"));
    assert_eq!(
        snapshot.rules[0].source_address_prefix.as_deref(),
        Some("203.0.113.5/32")
    );

    // live rules: same four, managed one moved to the new IP
    let rules = store.rules(&web_nsg());
    assert_eq!(rules.len(), 4);
    assert_eq!(rules[0].source_address_prefix.as_deref(), Some("203.0.113.9/32"));
    assert_eq!(rules[1..], snapshot.rules[1..]);

    let log = std::fs::read_to_string(&log_file).expect("read audit log");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], AUDIT_HEADER);
    assert!(lines[1].ends_with(",web01,web01-nsg,203.0.113.5,203.0.113.9"));
}

#[test]
fn test_unwritable_backup_dir_blocks_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "not a directory").expect("write blocker");

    let store = MemoryNsgStore::new();
    let directory = StaticVmDirectory::new().with_vm(vm("web01"), vec![web_nsg()]);
    let backups = FileBackupStore::new(&blocker, Tz::UTC);
    let audit = CsvAuditLog::new(dir.path().join("ip_log.csv"), Tz::UTC);
    let applier = ChangeApplier::new(&store, &backups, &audit);

    let summary = run(&ctx("203.0.113.5"), &directory, &applier, None).expect("run");
    assert_eq!(summary.failed(), 1);
    assert_eq!(store.writes.get(), 0);
    assert!(store.rules(&web_nsg()).is_empty());
}

#[test]
fn test_dump_reports_vm_without_nsg() {
    let store = MemoryNsgStore::new();
    let directory = StaticVmDirectory::new()
        .with_vm(vm("web01"), vec![web_nsg()])
        .with_vm(vm("lab01"), vec![]);
    assert!(!dump_rules(&store, &directory, None).expect("dump"));
    assert!(dump_rules(&store, &directory, Some("web01")).expect("dump"));
}
