//! Durable sinks for backups and the audit log.
//!
//! - [`backup`] - NSG snapshots as JSON files ([`BackupSink`])
//! - [`audit`] - IP change records as CSV rows ([`AuditSink`])
//! - [`memory`] - in-memory versions of every seam

mod audit;
mod backup;
pub mod memory;

use crate::error::Result;
use crate::models::{IpChangeRecord, NsgSnapshot};

pub use audit::{escape_csv_field, CsvAuditLog, AUDIT_HEADER};
pub use backup::{backup_file_name, load_snapshot, FileBackupStore};

/// Write-once store for NSG snapshots.
pub trait BackupSink {
    /// Persist `snapshot`, returning where it was written.
    fn store(&self, snapshot: &NsgSnapshot) -> Result<String>;
}

/// Append-only log of IP changes.
pub trait AuditSink {
    fn append(&self, record: &IpChangeRecord) -> Result<()>;
}
