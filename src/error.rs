//! Error types for azure-ssh-firewall.
//!
//! Errors are split into two groups: the ones that concern a single VM/NSG pair
//! (reported, then the run moves on) and the ones that make the whole run
//! pointless, see [`FwError::is_fatal`].

use std::fmt;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FwError>;

/// Classification of a failed remote (Azure) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    /// No valid session, expired token, or `az` not usable at all.
    Auth,
    /// The resource does not exist.
    NotFound,
    /// Session is valid but lacks the required role.
    Permission,
    /// Anything else, usually worth retrying by hand.
    Transient,
}

impl fmt::Display for CloudErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloudErrorKind::Auth => "auth",
            CloudErrorKind::NotFound => "not-found",
            CloudErrorKind::Permission => "permission",
            CloudErrorKind::Transient => "transient",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum FwError {
    #[error("Authentication failed: {0}. Run 'az login' and retry.")]
    Auth(String),

    #[error("Failed to read rules of NSG '{nsg}' ({kind}): {message}")]
    ReadFailed {
        nsg: String,
        kind: CloudErrorKind,
        message: String,
    },

    #[error("Failed to write rule into NSG '{nsg}' ({kind}): {message}")]
    WriteFailed {
        nsg: String,
        kind: CloudErrorKind,
        message: String,
    },

    #[error("Backup of NSG '{nsg}' failed, nothing was changed: {message}")]
    BackupWriteFailed { nsg: String, message: String },

    #[error("Priority {priority} in NSG '{nsg}' is already used by unmanaged rule '{rule}'")]
    PriorityConflict {
        nsg: String,
        priority: u32,
        rule: String,
    },

    #[error("No network security group associated with VM '{vm}'")]
    NoNsgFound { vm: String },

    #[error("Failed to append audit record to '{path}': {message}")]
    LogWriteFailed { path: String, message: String },

    #[error("No VM found with name: {0}")]
    VmNotFound(String),

    #[error("Public IP lookup failed: {0}")]
    IpLookup(String),

    #[error("Azure CLI call failed ({kind}): {message}")]
    Cli {
        kind: CloudErrorKind,
        message: String,
    },

    #[error("Unexpected response shape in {context} at path={path}: {message}")]
    Parse {
        context: String,
        path: String,
        message: String,
    },

    #[error("Invalid Azure resource id: {0}")]
    ResourceId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FwError {
    /// Turn a raw CLI failure into a per-NSG read failure.
    pub fn into_read_failed(self, nsg: &str) -> FwError {
        match self {
            FwError::Cli { kind, message } => FwError::ReadFailed {
                nsg: nsg.to_string(),
                kind,
                message,
            },
            other => other,
        }
    }

    /// Turn a raw CLI failure into a per-NSG write failure.
    pub fn into_write_failed(self, nsg: &str) -> FwError {
        match self {
            FwError::Cli { kind, message } => FwError::WriteFailed {
                nsg: nsg.to_string(),
                kind,
                message,
            },
            other => other,
        }
    }

    /// Remote failure classification, if this error came from a remote call.
    pub fn cloud_kind(&self) -> Option<CloudErrorKind> {
        match self {
            FwError::Auth(_) => Some(CloudErrorKind::Auth),
            FwError::ReadFailed { kind, .. }
            | FwError::WriteFailed { kind, .. }
            | FwError::Cli { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True when no further target can succeed, i.e. the session is gone.
    pub fn is_fatal(&self) -> bool {
        self.cloud_kind() == Some(CloudErrorKind::Auth)
    }
}
