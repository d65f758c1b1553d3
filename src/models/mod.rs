//! Domain models for azure-ssh-firewall.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`] - IPv4 address with CIDR notation support
//! - [`SecurityRule`] - one NSG rule, as Azure reports it
//! - [`Vm`], [`NsgRef`] and [`VmTarget`] - what gets reconciled
//! - [`NsgSnapshot`] and [`IpChangeRecord`] - what gets persisted

mod ipv4;
mod rule;
mod snapshot;
mod vm;

// Re-export public types
pub use ipv4::{Ipv4, MAX_LENGTH};
pub use rule::{Access, AsgRef, Direction, Protocol, SecurityRule};
pub use snapshot::{IpChangeRecord, NsgSnapshot};
pub use vm::{name_from_id, resource_group_from_id, NsgRef, Session, Vm, VmTarget};
