//! NSG security rule data model.
//!
//! Field names follow the Azure REST/CLI JSON (camelCase) so backups can be fed
//! back to `az` by hand.

use super::Ipv4;
use crate::config::SSH_PORT;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    #[serde(rename = "*")]
    Any,
    Icmp,
    Esp,
    Ah,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Allow,
    Deny,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "Inbound",
            Direction::Outbound => "Outbound",
        }
    }
}

impl Protocol {
    /// Value as accepted by `az network nsg rule create --protocol`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "Tcp",
            Protocol::Udp => "Udp",
            Protocol::Any => "*",
            Protocol::Icmp => "Icmp",
            Protocol::Esp => "Esp",
            Protocol::Ah => "Ah",
        }
    }
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Allow => "Allow",
            Access::Deny => "Deny",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Azure sends `null` for empty lists on some API versions.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_no_asgs<'de, D>(deserializer: D) -> Result<Vec<AsgRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<AsgRef>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Application security group used as a rule source or destination.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AsgRef {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One rule of a network security group.
///
/// Fields Azure returns that the tool does not interpret (`id`, `etag`,
/// `provisioningState`, ...) are kept in `extra` so a backup holds the rule
/// exactly as it was read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    /// Unique within the NSG.
    pub name: String,
    pub direction: Direction,
    pub protocol: Protocol,
    /// Single IP, CIDR, service tag or `*`. Unset when the list form is used.
    pub source_address_prefix: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source_address_prefixes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_no_asgs")]
    pub source_application_security_groups: Vec<AsgRef>,
    pub source_port_range: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source_port_ranges: Vec<String>,
    pub destination_address_prefix: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub destination_address_prefixes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_no_asgs")]
    pub destination_application_security_groups: Vec<AsgRef>,
    pub destination_port_range: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub destination_port_ranges: Vec<String>,
    pub access: Access,
    /// Lower is evaluated first, unique per direction.
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SecurityRule {
    /// Inbound TCP/22 allow rule from a single host.
    pub fn ssh_allow(name: &str, priority: u32, source: Ipv4) -> SecurityRule {
        SecurityRule {
            name: name.to_string(),
            direction: Direction::Inbound,
            protocol: Protocol::Tcp,
            source_address_prefix: Some(source.to_string()),
            source_address_prefixes: vec![],
            source_application_security_groups: vec![],
            source_port_range: Some("*".to_string()),
            source_port_ranges: vec![],
            destination_address_prefix: Some("*".to_string()),
            destination_address_prefixes: vec![],
            destination_application_security_groups: vec![],
            destination_port_range: Some(SSH_PORT.to_string()),
            destination_port_ranges: vec![],
            access: Access::Allow,
            priority,
            description: None,
            extra: Map::new(),
        }
    }

    /// Source prefix as a network, only when a single IPv4 prefix is set.
    pub fn source_ipv4(&self) -> Option<Ipv4> {
        if !self.source_address_prefixes.is_empty()
            || !self.source_application_security_groups.is_empty()
        {
            return None;
        }
        self.source_address_prefix
            .as_deref()
            .and_then(Ipv4::from_prefix)
    }

    /// Human readable source, joining the list form when used.
    pub fn source_display(&self) -> String {
        with_asgs(
            display_single_or_list(&self.source_address_prefix, &self.source_address_prefixes),
            &self.source_application_security_groups,
        )
    }

    pub fn source_ports_display(&self) -> String {
        display_single_or_list(&self.source_port_range, &self.source_port_ranges)
    }

    pub fn destination_display(&self) -> String {
        with_asgs(
            display_single_or_list(
                &self.destination_address_prefix,
                &self.destination_address_prefixes,
            ),
            &self.destination_application_security_groups,
        )
    }

    /// Human readable destination ports, joining the list form when used.
    pub fn destination_ports_display(&self) -> String {
        display_single_or_list(&self.destination_port_range, &self.destination_port_ranges)
    }
}

/// ASG names appended to an address display, `None` dropped when ASGs are set.
fn with_asgs(addresses: String, asgs: &[AsgRef]) -> String {
    if asgs.is_empty() {
        return addresses;
    }
    let names = asgs.iter().map(|asg| asg.name()).collect::<Vec<_>>().join(",");
    if addresses == "None" {
        format!("asg:{names}")
    } else {
        format!("{addresses},asg:{names}")
    }
}

impl AsgRef {
    /// Last segment of the resource id.
    pub fn name(&self) -> &str {
        self.id.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
    }
}

fn display_single_or_list(single: &Option<String>, list: &[String]) -> String {
    match single {
        Some(s) if list.is_empty() => s.clone(),
        Some(s) => format!("{s},{}", list.join(",")),
        None if list.is_empty() => "None".to_string(),
        None => list.join(","),
    }
}
