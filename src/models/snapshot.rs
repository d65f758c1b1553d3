//! Backup snapshots and audit records.

use super::{NsgRef, SecurityRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full copy of an NSG's rule list, taken right before it is modified.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NsgSnapshot {
    pub nsg: NsgRef,
    /// VM whose reconciliation triggered the backup.
    pub vm: String,
    pub taken_at: DateTime<Utc>,
    pub rules: Vec<SecurityRule>,
}

/// One row of the audit log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IpChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub vm: String,
    pub nsg: String,
    /// Source the managed rule allowed before, `None` when it was just created.
    pub previous_ip: Option<String>,
    pub new_ip: String,
}
