//! Runtime configuration and the per-run context.
//!
//! Values come from the environment (a `.env` file is loaded by `main`) and may
//! be overridden by command line flags, see [`Config::with_args`].

use crate::args::Args;
use crate::error::{FwError, Result};
use crate::models::Session;
use chrono_tz::Tz;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Pause between consecutive `az` calls.
pub const SLEEP_MSEC: u64 = 100;
/// Largest `az` stdout accepted before the response is treated as an error.
pub const MAX_CLI_OUTPUT: usize = 5_000_000;
/// The only port this tool manages.
pub const SSH_PORT: &str = "22";

pub const DEFAULT_BACKUP_DIR: &str = "nsg_backups";
pub const DEFAULT_AUDIT_LOG: &str = "ip_log.csv";
pub const DEFAULT_IP_URL: &str = "https://api.ipify.org";
pub const DEFAULT_RULE_NAME: &str = "az-fw-allow-ssh";
pub const DEFAULT_RULE_PRIORITY: u32 = 1000;
pub const DEFAULT_LOG_CONFIG: &str = "log4rs.yml";

/// Valid NSG priorities for custom rules.
const PRIORITY_RANGE: std::ops::RangeInclusive<u32> = 100..=4096;

/// Identity of the one rule this tool owns in every NSG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRule {
    pub name: String,
    pub priority: u32,
}

impl Default for ManagedRule {
    fn default() -> Self {
        ManagedRule {
            name: DEFAULT_RULE_NAME.to_string(),
            priority: DEFAULT_RULE_PRIORITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backup_dir: PathBuf,
    pub audit_log: PathBuf,
    pub ip_url: String,
    pub managed_rule: ManagedRule,
    pub timezone: Tz,
    pub log_config: PathBuf,
    /// Fixed IP from the command line, skips public IP discovery.
    pub ip_override: Option<Ipv4Addr>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            ip_url: DEFAULT_IP_URL.to_string(),
            managed_rule: ManagedRule::default(),
            timezone: Tz::UTC,
            log_config: PathBuf::from(DEFAULT_LOG_CONFIG),
            ip_override: None,
        }
    }
}

impl Config {
    /// Build a config from `AZ_FW_*` environment variables.
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, used by [`Config::from_env`] and tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(dir) = lookup("AZ_FW_BACKUP_DIR") {
            cfg.backup_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("AZ_FW_AUDIT_LOG") {
            cfg.audit_log = PathBuf::from(file);
        }
        if let Some(url) = lookup("AZ_FW_IP_URL") {
            cfg.ip_url = url;
        }
        if let Some(name) = lookup("AZ_FW_RULE_NAME") {
            let name = name.trim();
            if name.is_empty() {
                return Err(FwError::Config("AZ_FW_RULE_NAME must not be empty".into()));
            }
            cfg.managed_rule.name = name.to_string();
        }
        if let Some(priority) = lookup("AZ_FW_RULE_PRIORITY") {
            cfg.managed_rule.priority = parse_priority(&priority)?;
        }
        if let Some(tz) = lookup("AZ_FW_TIMEZONE") {
            cfg.timezone = tz
                .parse::<Tz>()
                .map_err(|e| FwError::Config(format!("AZ_FW_TIMEZONE={tz}: {e}")))?;
        }
        if let Some(path) = lookup("AZ_FW_LOG_CONFIG") {
            cfg.log_config = PathBuf::from(path);
        }
        Ok(cfg)
    }

    /// Apply command line overrides on top of the environment.
    pub fn with_args(mut self, args: &Args) -> Config {
        if let Some(dir) = &args.backup_dir {
            self.backup_dir = dir.clone();
        }
        if let Some(file) = &args.audit_log {
            self.audit_log = file.clone();
        }
        if let Some(path) = &args.log_config {
            self.log_config = path.clone();
        }
        if args.ip.is_some() {
            self.ip_override = args.ip;
        }
        self
    }
}

fn parse_priority(value: &str) -> Result<u32> {
    let priority: u32 = value
        .trim()
        .parse()
        .map_err(|e| FwError::Config(format!("AZ_FW_RULE_PRIORITY={value}: {e}")))?;
    if !PRIORITY_RANGE.contains(&priority) {
        return Err(FwError::Config(format!(
            "AZ_FW_RULE_PRIORITY={priority} outside {}..={}",
            PRIORITY_RANGE.start(),
            PRIORITY_RANGE.end()
        )));
    }
    Ok(priority)
}

/// Everything a run needs that is resolved once up front.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session: Session,
    pub current_ip: Ipv4Addr,
    pub managed_rule: ManagedRule,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.backup_dir, PathBuf::from("nsg_backups"));
        assert_eq!(cfg.audit_log, PathBuf::from("ip_log.csv"));
        assert_eq!(cfg.managed_rule.priority, 1000);
        assert_eq!(cfg.timezone, Tz::UTC);
    }

    #[test]
    fn test_env_values() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("AZ_FW_RULE_NAME", "my-ssh"),
            ("AZ_FW_RULE_PRIORITY", "310"),
            ("AZ_FW_TIMEZONE", "Pacific/Auckland"),
        ]))
        .unwrap();
        assert_eq!(cfg.managed_rule.name, "my-ssh");
        assert_eq!(cfg.managed_rule.priority, 310);
        assert_eq!(cfg.timezone, chrono_tz::Pacific::Auckland);
    }

    #[test]
    fn test_invalid_priority() {
        let err = Config::from_lookup(lookup_from(&[("AZ_FW_RULE_PRIORITY", "5000")]));
        assert!(matches!(err, Err(FwError::Config(_))));
        let err = Config::from_lookup(lookup_from(&[("AZ_FW_RULE_PRIORITY", "abc")]));
        assert!(matches!(err, Err(FwError::Config(_))));
    }

    #[test]
    fn test_invalid_timezone() {
        let err = Config::from_lookup(lookup_from(&[("AZ_FW_TIMEZONE", "Mars/Olympus")]));
        assert!(matches!(err, Err(FwError::Config(_))));
    }
}
