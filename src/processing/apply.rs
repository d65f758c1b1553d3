//! Applying a reconciliation plan to one NSG.
//!
//! Order per NSG: read, reconcile, (dry-run stops here) backup, write, audit.
//! Each step gates the next; nothing is written without a stored backup.

use super::reconcile::{reconcile, PlanAction};
use crate::azure::NsgRuleStore;
use crate::config::RunContext;
use crate::error::Result;
use crate::models::{IpChangeRecord, NsgRef, NsgSnapshot, SecurityRule, VmTarget};
use crate::store::{AuditSink, BackupSink};
use chrono::{TimeDelta, Utc};
use colored::Colorize;

/// What [`ChangeApplier::apply`] did, or would do, to one NSG.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub vm: String,
    pub nsg: NsgRef,
    pub action: PlanAction,
    /// The managed rule differs (or differed) from the desired one.
    pub changed: bool,
    pub dry_run: bool,
    /// Rule that a real run would write, dry-run only.
    pub would_apply: Option<SecurityRule>,
    /// Rule that was written.
    pub applied: Option<SecurityRule>,
    pub previous_ip: Option<String>,
    pub new_ip: String,
    /// Where the pre-change snapshot went.
    pub backup: Option<String>,
    /// Problems that did not undo the change, e.g. a failed audit append.
    pub warnings: Vec<String>,
}

pub struct ChangeApplier<'a> {
    pub store: &'a dyn NsgRuleStore,
    pub backups: &'a dyn BackupSink,
    pub audit: &'a dyn AuditSink,
}

impl<'a> ChangeApplier<'a> {
    pub fn new(
        store: &'a dyn NsgRuleStore,
        backups: &'a dyn BackupSink,
        audit: &'a dyn AuditSink,
    ) -> ChangeApplier<'a> {
        ChangeApplier {
            store,
            backups,
            audit,
        }
    }

    pub fn apply(&self, ctx: &RunContext, target: &VmTarget) -> Result<ApplyResult> {
        let nsg = &target.nsg;
        let rules = self.store.list_rules(nsg)?;

        let plan = reconcile(&rules, ctx.current_ip, &ctx.managed_rule)
            .map_err(|conflict| conflict.for_nsg(&nsg.name))?;

        let mut result = ApplyResult {
            vm: target.vm.clone(),
            nsg: nsg.clone(),
            action: plan.action,
            changed: plan.action != PlanAction::NoChangeNeeded,
            dry_run: ctx.dry_run,
            would_apply: None,
            applied: None,
            previous_ip: plan.previous_ip(),
            new_ip: plan.new_ip(),
            backup: None,
            warnings: vec![],
        };

        if plan.action == PlanAction::NoChangeNeeded {
            log::info!(
                "NSG {nsg} already allows SSH from {} for VM {}",
                result.new_ip,
                target.vm
            );
            return Ok(result);
        }

        if ctx.dry_run {
            log::info!(
                "{} would {} rule '{}' in NSG {nsg}: {} -> {}",
                "Dry run:".on_yellow(),
                plan.action,
                plan.target.name,
                result.previous_ip.as_deref().unwrap_or("none"),
                result.new_ip
            );
            result.would_apply = Some(plan.target);
            return Ok(result);
        }

        let snapshot = NsgSnapshot {
            nsg: nsg.clone(),
            vm: target.vm.clone(),
            taken_at: Utc::now(),
            rules,
        };
        result.backup = Some(self.backups.store(&snapshot)?);

        self.store.write_rule(nsg, &plan.target)?;
        log::info!(
            "{} NSG {nsg} to allow SSH from {} ({} rule '{}')",
            "Updated".green(),
            result.new_ip,
            plan.action,
            plan.target.name
        );

        // audit rows must sort after the backup they belong to
        let record = IpChangeRecord {
            timestamp: Utc::now().max(snapshot.taken_at + TimeDelta::microseconds(1)),
            vm: target.vm.clone(),
            nsg: nsg.name.clone(),
            previous_ip: result.previous_ip.clone(),
            new_ip: result.new_ip.clone(),
        };
        if let Err(e) = self.audit.append(&record) {
            log::warn!("{} {e}", "Change applied but not logged:".on_red());
            result.warnings.push(e.to_string());
        }

        result.applied = Some(plan.target);
        Ok(result)
    }
}
