//! CSV audit log of IP changes.

use super::AuditSink;
use crate::error::{FwError, Result};
use crate::models::IpChangeRecord;
use chrono::SecondsFormat;
use chrono_tz::Tz;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub const AUDIT_HEADER: &str = "timestamp,vm,nsg,previous_ip,new_ip";

/// Quote a CSV field when it contains a comma, quote or newline.
pub fn escape_csv_field(input: &str) -> String {
    if input.contains([',', '"', '\n']) {
        let escaped = input.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        input.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct CsvAuditLog {
    pub path: PathBuf,
    pub timezone: Tz,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> CsvAuditLog {
        CsvAuditLog {
            path: path.into(),
            timezone,
        }
    }

    /// CSV line for `record`, without the trailing newline.
    pub fn format_row(&self, record: &IpChangeRecord) -> String {
        let timestamp = record
            .timestamp
            .with_timezone(&self.timezone)
            .to_rfc3339_opts(SecondsFormat::Micros, false);
        [
            timestamp.as_str(),
            record.vm.as_str(),
            record.nsg.as_str(),
            record.previous_ip.as_deref().unwrap_or(""),
            record.new_ip.as_str(),
        ]
        .iter()
        .map(|f| escape_csv_field(f))
        .collect::<Vec<String>>()
        .join(",")
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{AUDIT_HEADER}")?;
        }
        writeln!(file, "{line}")?;
        file.flush()
    }
}

impl AuditSink for CsvAuditLog {
    fn append(&self, record: &IpChangeRecord) -> Result<()> {
        let line = self.format_row(record);
        self.append_line(&line)
            .map_err(|e| FwError::LogWriteFailed {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        log::debug!("Audit: {line}");
        Ok(())
    }
}
