//! Rule reconciliation.
//!
//! Pure comparison of an NSG's rules against the operator's current IP. The
//! managed rule is found by its reserved name and is the only rule ever
//! created or changed.

use crate::config::ManagedRule;
use crate::error::FwError;
use crate::models::{Direction, Ipv4, SecurityRule};
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    NoChangeNeeded,
    Create,
    Update,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanAction::NoChangeNeeded => "no change",
            PlanAction::Create => "create",
            PlanAction::Update => "update",
        };
        f.write_str(s)
    }
}

/// Outcome of [`reconcile`] for one NSG.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationPlan {
    /// The managed rule as it exists now, `None` if never created.
    pub current: Option<SecurityRule>,
    /// The managed rule as it should be.
    pub target: SecurityRule,
    pub action: PlanAction,
}

impl ReconciliationPlan {
    /// Source the managed rule allows today, a bare address for /32 hosts.
    pub fn previous_ip(&self) -> Option<String> {
        self.current.as_ref().map(|rule| match rule.source_ipv4() {
            Some(ip) if ip.is_host() => ip.addr.to_string(),
            Some(net) => net.to_string(),
            None => rule.source_display(),
        })
    }

    /// Source the managed rule will allow, a bare address.
    pub fn new_ip(&self) -> String {
        match self.target.source_ipv4() {
            Some(ip) => ip.addr.to_string(),
            None => self.target.source_display(),
        }
    }
}

/// The reserved priority is taken by a rule this tool does not own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityConflict {
    pub priority: u32,
    pub rule: String,
}

impl PriorityConflict {
    pub fn for_nsg(self, nsg: &str) -> FwError {
        FwError::PriorityConflict {
            nsg: nsg.to_string(),
            priority: self.priority,
            rule: self.rule,
        }
    }
}

/// Compute what has to happen so that `managed` allows SSH from `current_ip` only.
pub fn reconcile(
    existing: &[SecurityRule],
    current_ip: Ipv4Addr,
    managed: &ManagedRule,
) -> Result<ReconciliationPlan, PriorityConflict> {
    let desired = Ipv4::host(current_ip);
    // Azure rule names are case-insensitive
    let found = existing
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(&managed.name));

    let Some(current) = found else {
        if let Some(foreign) = existing
            .iter()
            .find(|r| r.direction == Direction::Inbound && r.priority == managed.priority)
        {
            return Err(PriorityConflict {
                priority: managed.priority,
                rule: foreign.name.clone(),
            });
        }
        return Ok(ReconciliationPlan {
            current: None,
            target: SecurityRule::ssh_allow(&managed.name, managed.priority, desired),
            action: PlanAction::Create,
        });
    };

    if current.source_ipv4() == Some(desired) {
        return Ok(ReconciliationPlan {
            current: Some(current.clone()),
            target: current.clone(),
            action: PlanAction::NoChangeNeeded,
        });
    }

    let mut target = current.clone();
    target.source_address_prefix = Some(desired.to_string());
    target.source_address_prefixes.clear();
    target.source_application_security_groups.clear();
    Ok(ReconciliationPlan {
        current: Some(current.clone()),
        target,
        action: PlanAction::Update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Access, Protocol};

    fn managed() -> ManagedRule {
        ManagedRule {
            name: "az-fw-allow-ssh".to_string(),
            priority: 1000,
        }
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn foreign_rule(name: &str, priority: u32, direction: Direction) -> SecurityRule {
        SecurityRule {
            name: name.to_string(),
            direction,
            source_address_prefix: Some("Internet".to_string()),
            destination_port_range: Some("443".to_string()),
            ..SecurityRule::ssh_allow(name, priority, Ipv4::host(Ipv4Addr::UNSPECIFIED))
        }
    }

    #[test]
    fn test_create_update_sequence() {
        let mut rules: Vec<SecurityRule> = vec![];

        let plan = reconcile(&rules, ip("203.0.113.5"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Create);
        assert_eq!(
            plan.target.source_address_prefix.as_deref(),
            Some("203.0.113.5/32")
        );
        assert_eq!(plan.target.priority, 1000);
        assert_eq!(plan.target.direction, Direction::Inbound);
        assert_eq!(plan.target.protocol, Protocol::Tcp);
        assert_eq!(plan.target.access, Access::Allow);
        assert_eq!(plan.target.destination_port_range.as_deref(), Some("22"));
        assert_eq!(plan.previous_ip(), None);
        rules.push(plan.target);

        let plan = reconcile(&rules, ip("203.0.113.5"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::NoChangeNeeded);

        let plan = reconcile(&rules, ip("203.0.113.9"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Update);
        assert_eq!(
            plan.target.source_address_prefix.as_deref(),
            Some("203.0.113.9/32")
        );
        assert_eq!(plan.previous_ip().as_deref(), Some("203.0.113.5"));
        assert_eq!(plan.new_ip(), "203.0.113.9");
    }

    #[test]
    fn test_update_only_touches_source() {
        let mut existing =
            SecurityRule::ssh_allow("az-fw-allow-ssh", 1200, Ipv4::host(ip("198.51.100.1")));
        existing.description = Some("managed".to_string());
        let plan = reconcile(&[existing.clone()], ip("198.51.100.2"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Update);
        // the existing priority is kept, not reset to the configured one
        assert_eq!(plan.target.priority, 1200);
        assert_eq!(plan.target.description.as_deref(), Some("managed"));
        let mut expected = existing;
        expected.source_address_prefix = Some("198.51.100.2/32".to_string());
        assert_eq!(plan.target, expected);
    }

    #[test]
    fn test_bare_address_prefix_is_no_change() {
        let mut existing =
            SecurityRule::ssh_allow("az-fw-allow-ssh", 1000, Ipv4::host(ip("203.0.113.5")));
        existing.source_address_prefix = Some("203.0.113.5".to_string());
        let plan = reconcile(&[existing], ip("203.0.113.5"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::NoChangeNeeded);
    }

    #[test]
    fn test_prefix_list_is_collapsed() {
        let mut existing =
            SecurityRule::ssh_allow("AZ-FW-ALLOW-SSH", 1000, Ipv4::host(ip("203.0.113.5")));
        existing.source_address_prefix = None;
        existing.source_address_prefixes =
            vec!["203.0.113.5/32".to_string(), "198.51.100.7/32".to_string()];
        let plan = reconcile(&[existing], ip("203.0.113.5"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Update);
        assert!(plan.target.source_address_prefixes.is_empty());
        assert_eq!(
            plan.previous_ip().as_deref(),
            Some("203.0.113.5/32,198.51.100.7/32")
        );
    }

    #[test]
    fn test_update_keeps_list_fields_and_drops_source_asgs() {
        let json = r#"{
            "name": "az-fw-allow-ssh",
            "direction": "Inbound",
            "protocol": "Tcp",
            "sourceApplicationSecurityGroups": [{"id": "/subscriptions/0/resourceGroups/rg/providers/Microsoft.Network/applicationSecurityGroups/old"}],
            "sourcePortRanges": ["1024-2048"],
            "destinationAddressPrefixes": ["10.0.0.4"],
            "destinationPortRange": "22",
            "access": "Allow",
            "priority": 1000,
            "etag": "W/\"7\""
        }"#;
        let existing: SecurityRule = serde_json::from_str(json).unwrap();
        let plan = reconcile(&[existing.clone()], ip("203.0.113.5"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Update);
        let expected = SecurityRule {
            source_address_prefix: Some("203.0.113.5/32".to_string()),
            source_application_security_groups: vec![],
            ..existing
        };
        assert_eq!(plan.target, expected);
    }

    #[test]
    fn test_priority_conflict_with_foreign_rule() {
        let rules = vec![foreign_rule("AllowHttps", 1000, Direction::Inbound)];
        let err = reconcile(&rules, ip("203.0.113.5"), &managed()).unwrap_err();
        assert_eq!(
            err,
            PriorityConflict {
                priority: 1000,
                rule: "AllowHttps".to_string()
            }
        );
        let err = err.for_nsg("web01-nsg");
        assert!(err.to_string().contains("web01-nsg"));
    }

    #[test]
    fn test_outbound_rule_at_same_priority_is_fine() {
        let rules = vec![foreign_rule("DenyOut", 1000, Direction::Outbound)];
        let plan = reconcile(&rules, ip("203.0.113.5"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Create);
    }

    #[test]
    fn test_existing_managed_rule_ignores_priority_check() {
        // the reserved priority is only checked on create
        let rules = vec![
            SecurityRule::ssh_allow("az-fw-allow-ssh", 1000, Ipv4::host(ip("203.0.113.5"))),
            foreign_rule("Other", 1000, Direction::Inbound),
        ];
        let plan = reconcile(&rules, ip("203.0.113.6"), &managed()).unwrap();
        assert_eq!(plan.action, PlanAction::Update);
    }
}
