//! Access policy - Security groups and their ingress rules

use std::fmt;

use streamline_core::{Resource, Value};

use crate::config::PortRange;
use crate::network::NetworkBoundary;
use crate::resources as rt;

const ANY_IPV4: &str = "0.0.0.0/0";

/// Source of an ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    /// Any IPv4 address
    AnyIpv4,
    Cidr(String),
    /// Another security group, by logical ID
    Group(String),
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::AnyIpv4 => write!(f, "{}", ANY_IPV4),
            Peer::Cidr(cidr) => write!(f, "{}", cidr),
            Peer::Group(id) => write!(f, "{}", id),
        }
    }
}

/// One TCP ingress permission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub peer: Peer,
    pub ports: PortRange,
    pub description: String,
}

/// Named set of ingress rules bound to a network
#[derive(Debug, Clone)]
pub struct AccessGroup {
    pub logical_id: String,
    pub description: String,
    pub allow_all_outbound: bool,
    vpc_id: Value,
    rules: Vec<AccessRule>,
}

impl AccessGroup {
    pub fn new(
        logical_id: impl Into<String>,
        network: &NetworkBoundary,
        description: impl Into<String>,
        allow_all_outbound: bool,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            description: description.into(),
            allow_all_outbound,
            vpc_id: network.vpc_id(),
            rules: Vec::new(),
        }
    }

    /// Append an ingress rule. Rules are never merged or deduplicated.
    pub fn add_ingress_rule(
        &mut self,
        peer: Peer,
        ports: PortRange,
        description: impl Into<String>,
    ) -> &mut Self {
        let rule = AccessRule {
            peer,
            ports,
            description: description.into(),
        };
        log::debug!(
            "{} allows {} from {}",
            self.logical_id,
            rule.ports,
            rule.peer
        );
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Reference to the group ID
    pub fn group_id(&self) -> Value {
        Value::attr(&self.logical_id, "GroupId")
    }

    /// True if traffic from the given group may reach `port`
    pub fn allows_from_group(&self, group: &str, port: u16) -> bool {
        self.rules.iter().any(|rule| {
            matches!(&rule.peer, Peer::Group(id) if id == group) && rule.ports.contains(port)
        })
    }

    /// True if any IPv4 address may reach `port`
    pub fn allows_from_anywhere(&self, port: u16) -> bool {
        self.rules.iter().any(|rule| {
            let open = match &rule.peer {
                Peer::AnyIpv4 => true,
                Peer::Cidr(cidr) => cidr == ANY_IPV4,
                Peer::Group(_) => false,
            };
            open && rule.ports.contains(port)
        })
    }

    /// Ports opened to any IPv4 address, in rule order
    pub fn open_ports(&self) -> impl Iterator<Item = &PortRange> {
        self.rules
            .iter()
            .filter(|rule| matches!(&rule.peer, Peer::AnyIpv4))
            .map(|rule| &rule.ports)
    }

    /// The security group, followed by one ingress resource per peer-group rule
    pub fn resources(&self) -> Vec<Resource> {
        let inline: Vec<Value> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let cidr = match &rule.peer {
                    Peer::AnyIpv4 => ANY_IPV4,
                    Peer::Cidr(cidr) => cidr.as_str(),
                    Peer::Group(_) => return None,
                };
                Some(Value::map([
                    ("cidr_ip", Value::from(cidr)),
                    ("ip_protocol", Value::from("tcp")),
                    ("from_port", Value::Int(i64::from(rule.ports.from))),
                    ("to_port", Value::Int(i64::from(rule.ports.to))),
                    ("description", Value::from(rule.description.as_str())),
                ]))
            })
            .collect();

        let egress = if self.allow_all_outbound {
            Value::map([
                ("cidr_ip", Value::from(ANY_IPV4)),
                ("ip_protocol", Value::from("-1")),
                ("description", Value::from("Allow all outbound traffic by default")),
            ])
        } else {
            // An empty egress list would leave the implicit allow-all rule in place
            Value::map([
                ("cidr_ip", Value::from("255.255.255.255/32")),
                ("ip_protocol", Value::from("icmp")),
                ("from_port", Value::Int(252)),
                ("to_port", Value::Int(86)),
                ("description", Value::from("Disallow all traffic")),
            ])
        };

        let mut group = Resource::new(rt::SECURITY_GROUP, &self.logical_id)
            .with_attribute("group_description", self.description.as_str())
            .with_attribute("vpc_id", self.vpc_id.clone())
            .with_attribute("security_group_egress", Value::List(vec![egress]))
            .with_attribute("tags", Value::map([("Name", Value::from(self.logical_id.as_str()))]));
        if !inline.is_empty() {
            group = group.with_attribute("security_group_ingress", Value::List(inline));
        }

        let mut resources = vec![group];
        for (index, rule) in self.rules.iter().enumerate() {
            let Peer::Group(source) = &rule.peer else {
                continue;
            };
            resources.push(
                Resource::new(
                    rt::SECURITY_GROUP_INGRESS,
                    format!("{}Ingress{}", self.logical_id, index + 1),
                )
                .with_attribute("group_id", self.group_id())
                .with_attribute("source_security_group_id", Value::attr(source, "GroupId"))
                .with_attribute("ip_protocol", "tcp")
                .with_attribute("from_port", Value::Int(i64::from(rule.ports.from)))
                .with_attribute("to_port", Value::Int(i64::from(rule.ports.to)))
                .with_attribute("description", rule.description.as_str()),
            );
        }
        resources
    }
}
