//! Reconciliation logic.
//!
//! - [`reconcile`] - compare the managed rule with the current IP
//! - [`apply`] - backup, write and audit one NSG
//! - [`targets`] - resolve VMs to (VM, NSG) pairs
//! - [`orchestrate`] - run everything and summarise

mod apply;
mod orchestrate;
mod reconcile;
mod targets;

// Re-export public functions
pub use apply::{ApplyResult, ChangeApplier};
pub use orchestrate::{run, run_selection, RunSummary, VmOutcome, VmStatus};
pub use reconcile::{reconcile, PlanAction, PriorityConflict, ReconciliationPlan};
pub use targets::{select_targets, select_vms, Selected};
