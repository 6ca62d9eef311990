//! Load balancer - Public entry point, its listeners and target groups

use streamline_core::{Resource, Value};

use crate::access::AccessGroup;
use crate::config::{HealthCheckConfig, SubnetType};
use crate::error::StackError;
use crate::network::NetworkBoundary;
use crate::resources as rt;

/// Listener protocol. HTTPS always carries its certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerProtocol {
    Http,
    Https { certificate_arn: String },
}

impl ListenerProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerProtocol::Http => "HTTP",
            ListenerProtocol::Https { .. } => "HTTPS",
        }
    }
}

/// What a listener does with a request when no rule matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultAction {
    /// Forward to target groups, by logical ID; empty answers 503
    Forward(Vec<String>),
    /// Permanent redirect to HTTPS on the given port
    RedirectToHttps(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub logical_id: String,
    pub port: u16,
    pub protocol: ListenerProtocol,
    pub action: DefaultAction,
}

impl Listener {
    /// Target groups this listener forwards to
    pub fn target_groups(&self) -> &[String] {
        match &self.action {
            DefaultAction::Forward(groups) => groups,
            DefaultAction::RedirectToHttps(_) => &[],
        }
    }

    fn resource(&self, load_balancer: &str) -> Resource {
        let actions = match &self.action {
            DefaultAction::Forward(groups) if groups.is_empty() => vec![Value::map([
                ("type", Value::from("fixed-response")),
                (
                    "fixed_response_config",
                    Value::map([
                        ("status_code", Value::from("503")),
                        ("content_type", Value::from("text/plain")),
                        ("message_body", Value::from("No targets are registered")),
                    ]),
                ),
            ])],
            DefaultAction::Forward(groups) if groups.len() == 1 => vec![Value::map([
                ("type", Value::from("forward")),
                ("target_group_arn", Value::Ref(groups[0].clone())),
            ])],
            DefaultAction::Forward(groups) => vec![Value::map([
                ("type", Value::from("forward")),
                (
                    "forward_config",
                    Value::map([(
                        "target_groups",
                        Value::List(
                            groups
                                .iter()
                                .map(|g| {
                                    Value::map([("target_group_arn", Value::Ref(g.clone()))])
                                })
                                .collect(),
                        ),
                    )]),
                ),
            ])],
            DefaultAction::RedirectToHttps(port) => vec![Value::map([
                ("type", Value::from("redirect")),
                (
                    "redirect_config",
                    Value::map([
                        ("protocol", Value::from("HTTPS")),
                        ("port", Value::from(port.to_string())),
                        ("status_code", Value::from("HTTP_301")),
                    ]),
                ),
            ])],
        };

        let mut resource = Resource::new(rt::LISTENER, &self.logical_id)
            .with_attribute("load_balancer_arn", Value::Ref(load_balancer.to_string()))
            .with_attribute("port", Value::Int(i64::from(self.port)))
            .with_attribute("protocol", self.protocol.as_str())
            .with_attribute("default_actions", Value::List(actions));
        if let ListenerProtocol::Https { certificate_arn } = &self.protocol {
            resource = resource.with_attribute(
                "certificates",
                Value::List(vec![Value::map([(
                    "certificate_arn",
                    Value::from(certificate_arn.as_str()),
                )])]),
            );
        }
        resource
    }
}

/// Forwarding destination with its health check policy
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup {
    pub logical_id: String,
    pub port: u16,
    /// Load balancer owning this group, by logical ID
    pub load_balancer: String,
    pub health_check: HealthCheckConfig,
    vpc_id: Value,
}

impl TargetGroup {
    pub fn arn(&self) -> Value {
        Value::Ref(self.logical_id.clone())
    }

    fn resource(&self) -> Resource {
        let check = &self.health_check;
        Resource::new(rt::TARGET_GROUP, &self.logical_id)
            .with_attribute("port", Value::Int(i64::from(self.port)))
            .with_attribute("protocol", "HTTP")
            .with_attribute("vpc_id", self.vpc_id.clone())
            .with_attribute("target_type", "instance")
            .with_attribute("health_check_enabled", true)
            .with_attribute("health_check_path", check.path.as_str())
            .with_attribute("health_check_protocol", "HTTP")
            .with_attribute(
                "health_check_interval_seconds",
                Value::Int(i64::from(check.interval_seconds)),
            )
            .with_attribute(
                "healthy_threshold_count",
                Value::Int(i64::from(check.healthy_threshold)),
            )
            .with_attribute(
                "unhealthy_threshold_count",
                Value::Int(i64::from(check.unhealthy_threshold)),
            )
            .with_attribute(
                "matcher",
                Value::map([("http_code", Value::from(check.matcher.as_str()))]),
            )
    }
}

/// Application load balancer spread over the public subnets of a network
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    pub logical_id: String,
    pub name: Option<String>,
    pub internet_facing: bool,
    /// Access group guarding the load balancer, by logical ID
    pub access_group: String,
    vpc_id: Value,
    subnets: Vec<Value>,
    access_group_id: Value,
    listeners: Vec<Listener>,
    target_groups: Vec<TargetGroup>,
}

impl LoadBalancer {
    pub fn new(
        logical_id: impl Into<String>,
        network: &NetworkBoundary,
        group: &AccessGroup,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            name: None,
            internet_facing: true,
            access_group: group.logical_id.clone(),
            vpc_id: network.vpc_id(),
            subnets: network
                .subnets_of_type(SubnetType::Public)
                .map(|s| s.reference())
                .collect(),
            access_group_id: group.group_id(),
            listeners: Vec::new(),
            target_groups: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn internal(mut self) -> Self {
        self.internet_facing = false;
        self
    }

    /// Declare a target group owned by this load balancer
    pub fn add_target_group(
        &mut self,
        logical_id: impl Into<String>,
        port: u16,
        health_check: HealthCheckConfig,
    ) -> &TargetGroup {
        let group = TargetGroup {
            logical_id: logical_id.into(),
            port,
            load_balancer: self.logical_id.clone(),
            health_check,
            vpc_id: self.vpc_id.clone(),
        };
        self.target_groups.push(group);
        &self.target_groups[self.target_groups.len() - 1]
    }

    /// Declare a listener forwarding to target groups declared on this load balancer
    pub fn add_listener(
        &mut self,
        port: u16,
        protocol: ListenerProtocol,
        default_target_groups: &[&str],
    ) -> Result<&Listener, StackError> {
        if let ListenerProtocol::Https { certificate_arn } = &protocol
            && certificate_arn.trim().is_empty()
        {
            return Err(StackError::MissingCertificate { port });
        }
        let action = DefaultAction::Forward(
            default_target_groups
                .iter()
                .map(|g| g.to_string())
                .collect(),
        );
        Ok(self.push_listener(port, protocol, action))
    }

    /// Declare a plain HTTP listener redirecting to HTTPS on `https_port`
    pub fn add_redirect_listener(&mut self, port: u16, https_port: u16) -> &Listener {
        self.push_listener(
            port,
            ListenerProtocol::Http,
            DefaultAction::RedirectToHttps(https_port),
        )
    }

    fn push_listener(
        &mut self,
        port: u16,
        protocol: ListenerProtocol,
        action: DefaultAction,
    ) -> &Listener {
        let listener = Listener {
            logical_id: format!("{}Listener{}", self.logical_id, port),
            port,
            protocol,
            action,
        };
        log::debug!(
            "{} listens on {} {}",
            self.logical_id,
            listener.protocol.as_str(),
            port
        );
        self.listeners.push(listener);
        &self.listeners[self.listeners.len() - 1]
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn listener_on(&self, port: u16) -> Option<&Listener> {
        self.listeners.iter().find(|l| l.port == port)
    }

    pub fn target_groups(&self) -> &[TargetGroup] {
        &self.target_groups
    }

    pub fn target_group(&self, logical_id: &str) -> Option<&TargetGroup> {
        self.target_groups.iter().find(|t| t.logical_id == logical_id)
    }

    /// DNS name assigned at deploy time
    pub fn dns_name(&self) -> Value {
        Value::attr(&self.logical_id, "DNSName")
    }

    pub fn resources(&self) -> Vec<Resource> {
        let scheme = if self.internet_facing {
            "internet-facing"
        } else {
            "internal"
        };
        let mut balancer = Resource::new(rt::LOAD_BALANCER, &self.logical_id)
            .with_attribute("scheme", scheme)
            .with_attribute("type", "application")
            .with_attribute("subnets", Value::List(self.subnets.clone()))
            .with_attribute(
                "security_groups",
                Value::List(vec![self.access_group_id.clone()]),
            )
            .with_attribute(
                "tags",
                Value::map([("Name", Value::from(self.logical_id.as_str()))]),
            );
        if let Some(name) = &self.name {
            balancer = balancer.with_attribute("name", name.as_str());
        }

        let mut resources = vec![balancer];
        resources.extend(self.target_groups.iter().map(TargetGroup::resource));
        resources.extend(self.listeners.iter().map(|l| l.resource(&self.logical_id)));
        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;

    fn fixture() -> LoadBalancer {
        let network = NetworkBoundary::declare("Test", &NetworkConfig::default()).unwrap();
        let group = AccessGroup::new("LbSg", &network, "lb", true);
        LoadBalancer::new("Alb", &network, &group)
    }

    fn actions(resource: &Resource) -> &Vec<Value> {
        let Value::List(actions) = &resource.attributes["default_actions"] else {
            panic!("Expected action list");
        };
        actions
    }

    #[test]
    fn load_balancer_spans_public_subnets() {
        let lb = fixture();
        let resources = lb.resources();
        assert_eq!(
            resources[0].attributes["subnets"],
            Value::List(vec![
                Value::Ref("TestPublicSubnet1".to_string()),
                Value::Ref("TestPublicSubnet2".to_string()),
            ])
        );
        assert_eq!(resources[0].attributes["scheme"], Value::from("internet-facing"));
        assert!(!resources[0].attributes.contains_key("name"));
    }

    #[test]
    fn listener_forwards_to_its_target_group() {
        let mut lb = fixture();
        lb.add_target_group("Tg", 80, HealthCheckConfig::default());
        let listener = lb.add_listener(80, ListenerProtocol::Http, &["Tg"]).unwrap();
        assert_eq!(listener.logical_id, "AlbListener80");
        assert_eq!(listener.target_groups(), ["Tg".to_string()]);

        let resources = lb.resources();
        let listener = resources.iter().find(|r| r.logical_id() == "AlbListener80").unwrap();
        let Value::Map(action) = &actions(listener)[0] else {
            panic!("Expected action map");
        };
        assert_eq!(action["type"], Value::from("forward"));
        assert_eq!(action["target_group_arn"], Value::Ref("Tg".to_string()));
        assert_eq!(listener.dependencies(), vec!["Alb", "Tg"]);
    }

    #[test]
    fn listener_without_targets_answers_503() {
        let mut lb = fixture();
        lb.add_listener(80, ListenerProtocol::Http, &[]).unwrap();
        let resources = lb.resources();
        let Value::Map(action) = &actions(&resources[1])[0] else {
            panic!("Expected action map");
        };
        assert_eq!(action["type"], Value::from("fixed-response"));
    }

    #[test]
    fn https_listener_carries_certificate() {
        let mut lb = fixture();
        lb.add_target_group("Tg", 80, HealthCheckConfig::default());
        let arn = "arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string();
        lb.add_listener(
            443,
            ListenerProtocol::Https {
                certificate_arn: arn.clone(),
            },
            &["Tg"],
        )
        .unwrap();
        lb.add_redirect_listener(80, 443);

        let resources = lb.resources();
        let https = resources.iter().find(|r| r.logical_id() == "AlbListener443").unwrap();
        assert_eq!(https.attributes["protocol"], Value::from("HTTPS"));
        assert!(https.attributes.contains_key("certificates"));

        let redirect = lb.listener_on(80).unwrap();
        assert!(redirect.target_groups().is_empty());
        assert_eq!(redirect.action, DefaultAction::RedirectToHttps(443));
    }

    #[test]
    fn https_listener_with_blank_certificate_is_rejected() {
        let mut lb = fixture();
        let result = lb.add_listener(
            443,
            ListenerProtocol::Https {
                certificate_arn: " ".to_string(),
            },
            &[],
        );
        assert!(matches!(
            result,
            Err(StackError::MissingCertificate { port: 443 })
        ));
    }

    #[test]
    fn target_group_knows_its_load_balancer() {
        let mut lb = fixture();
        let group = lb.add_target_group("Tg", 80, HealthCheckConfig::default());
        assert_eq!(group.load_balancer, "Alb");
        assert_eq!(lb.dns_name(), Value::attr("Alb", "DNSName"));
    }
}
