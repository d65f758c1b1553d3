//! NSG snapshots written as JSON files.
//!
//! One file per snapshot, `<nsg>_<YYYYmmddHHMMSS>.json`, never overwritten.

use super::BackupSink;
use crate::error::{FwError, Result};
use crate::models::NsgSnapshot;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Give up finding a free file name after this many same-second snapshots.
const MAX_NAME_ATTEMPTS: usize = 100;

/// File name for a snapshot of `nsg_name`; `attempt > 0` adds a suffix.
pub fn backup_file_name(nsg_name: &str, taken_at: DateTime<Utc>, tz: Tz, attempt: usize) -> String {
    let stamp = taken_at.with_timezone(&tz).format("%Y%m%d%H%M%S");
    if attempt == 0 {
        format!("{nsg_name}_{stamp}.json")
    } else {
        format!("{nsg_name}_{stamp}_{attempt}.json")
    }
}

/// Read a snapshot back, e.g. to restore rules by hand.
pub fn load_snapshot(path: &Path) -> Result<NsgSnapshot> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[derive(Debug, Clone)]
pub struct FileBackupStore {
    pub dir: PathBuf,
    pub timezone: Tz,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>, timezone: Tz) -> FileBackupStore {
        FileBackupStore {
            dir: dir.into(),
            timezone,
        }
    }

    fn write_new(&self, snapshot: &NsgSnapshot, json: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(backup_file_name(
                &snapshot.nsg.name,
                snapshot.taken_at,
                self.timezone,
                attempt,
            ));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    file.sync_all()?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free backup file name after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    }
}

impl BackupSink for FileBackupStore {
    fn store(&self, snapshot: &NsgSnapshot) -> Result<String> {
        let backup_failed = |message: String| FwError::BackupWriteFailed {
            nsg: snapshot.nsg.name.clone(),
            message,
        };
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| backup_failed(format!("serializing snapshot: {e}")))?;
        let path = self
            .write_new(snapshot, &json)
            .map_err(|e| backup_failed(format!("{}: {e}", self.dir.display())))?;
        log::info!("Backed up NSG {} to {}", snapshot.nsg, path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ipv4, NsgRef, SecurityRule};
    use chrono::TimeZone;
    use std::net::Ipv4Addr;

    fn snapshot() -> NsgSnapshot {
        NsgSnapshot {
            nsg: NsgRef {
                id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/web01-nsg".into(),
                name: "web01-nsg".into(),
                resource_group: "rg".into(),
            },
            vm: "web01".into(),
            taken_at: Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 5).unwrap(),
            rules: vec![SecurityRule::ssh_allow(
                "az-fw-allow-ssh",
                1000,
                Ipv4::host(Ipv4Addr::new(203, 0, 113, 5)),
            )],
        }
    }

    #[test]
    fn test_backup_file_name() {
        let taken_at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 5).unwrap();
        assert_eq!(
            backup_file_name("nsg", taken_at, Tz::UTC, 0),
            "nsg_20240301233005.json"
        );
        // Auckland is UTC+13 in March
        assert_eq!(
            backup_file_name("nsg", taken_at, chrono_tz::Pacific::Auckland, 2),
            "nsg_20240302123005_2.json"
        );
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackupStore::new(dir.path().join("nsg_backups"), Tz::UTC);
        let path = store.store(&snapshot()).unwrap();
        assert!(path.ends_with("web01-nsg_20240301233005.json"));
        let loaded = load_snapshot(Path::new(&path)).unwrap();
        assert_eq!(loaded, snapshot());
    }

    #[test]
    fn test_store_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackupStore::new(dir.path(), Tz::UTC);
        let first = store.store(&snapshot()).unwrap();
        let second = store.store(&snapshot()).unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("web01-nsg_20240301233005_1.json"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_store_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file in the way").unwrap();
        let store = FileBackupStore::new(&blocker, Tz::UTC);
        let err = store.store(&snapshot()).unwrap_err();
        assert!(matches!(err, FwError::BackupWriteFailed { ref nsg, .. } if nsg == "web01-nsg"));
    }
}
