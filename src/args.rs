//! Command line surface.

use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Keep SSH (port 22) on Azure VMs open to your current public IP only.
///
/// Without a mode flag the managed rule of every targeted NSG is updated.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "azure-ssh-firewall", version, about, long_about = None)]
pub struct Args {
    /// List all virtual machines in the subscription.
    #[arg(long, conflicts_with_all = ["dump", "dry_run"])]
    pub list: bool,

    /// Dump the firewall rules of all VMs (or the one given by --vm).
    #[arg(long, conflicts_with = "dry_run")]
    pub dump: bool,

    /// Show what would change without touching any NSG, backup or log.
    #[arg(long)]
    pub dry_run: bool,

    /// Only operate on the VM with this name.
    #[arg(long, value_name = "NAME")]
    pub vm: Option<String>,

    /// Use this IPv4 address instead of looking up the public IP.
    #[arg(long, value_name = "IPV4")]
    pub ip: Option<Ipv4Addr>,

    /// Directory for NSG backups.
    #[arg(long, value_name = "DIR", env = "AZ_FW_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// CSV file recording every IP change.
    #[arg(long, value_name = "FILE", env = "AZ_FW_AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,

    /// log4rs configuration file.
    #[arg(long, value_name = "FILE", env = "AZ_FW_LOG_CONFIG")]
    pub log_config: Option<PathBuf>,

    /// More log output when no log4rs config file is found.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a single invocation is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Dump,
    DryRun,
    Apply,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.list {
            Mode::List
        } else if self.dump {
            Mode::Dump
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Apply
        }
    }
}
