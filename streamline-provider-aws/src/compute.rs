//! Scalable compute pool - Launch template, Auto Scaling Group and scaling policy

use streamline_core::{Resource, Value};

use crate::access::AccessGroup;
use crate::config::{BlockDeviceConfig, CapacityConfig, ScalingConfig, ScalingMetric, SubnetType};
use crate::error::StackError;
use crate::identity::ComputeRole;
use crate::load_balancer::TargetGroup;
use crate::network::NetworkBoundary;
use crate::resources as rt;

/// SSM public parameters resolving to the latest Amazon Linux images
pub const AMAZON_LINUX_2_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2";
pub const AMAZON_LINUX_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2";

/// Machine image instances boot from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineImage {
    AmazonLinux2,
    AmazonLinux,
    /// Literal AMI ID
    Ami(String),
}

impl MachineImage {
    pub fn parse(s: &str) -> Result<Self, StackError> {
        match s {
            "amazon-linux-2" => Ok(MachineImage::AmazonLinux2),
            "amazon-linux" => Ok(MachineImage::AmazonLinux),
            ami if ami.starts_with("ami-") && ami.len() > 4 => Ok(MachineImage::Ami(ami.to_string())),
            other => Err(StackError::MachineImage(other.to_string())),
        }
    }

    /// SSM parameter path, if the image is resolved at deploy time
    pub fn ssm_parameter(&self) -> Option<&'static str> {
        match self {
            MachineImage::AmazonLinux2 => Some(AMAZON_LINUX_2_PARAMETER),
            MachineImage::AmazonLinux => Some(AMAZON_LINUX_PARAMETER),
            MachineImage::Ami(_) => None,
        }
    }
}

/// Validated `min <= desired <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    min: u32,
    desired: u32,
    max: u32,
}

impl Capacity {
    pub fn new(min: u32, desired: u32, max: u32) -> Result<Self, StackError> {
        if min <= desired && desired <= max {
            Ok(Self { min, desired, max })
        } else {
            Err(StackError::CapacityBounds { min, desired, max })
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn desired(&self) -> u32 {
        self.desired
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl TryFrom<CapacityConfig> for Capacity {
    type Error = StackError;

    fn try_from(config: CapacityConfig) -> Result<Self, Self::Error> {
        Capacity::new(config.min, config.desired, config.max)
    }
}

/// Registration of the pool with a target group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub target_group: String,
    pub load_balancer: String,
}

/// Auto Scaling Group of homogeneous instances
#[derive(Debug, Clone)]
pub struct ScalablePool {
    pub logical_id: String,
    pub network: String,
    pub placement: SubnetType,
    pub capacity: Capacity,
    pub instance_type: String,
    pub key_name: Option<String>,
    /// Access group of the instances, by logical ID
    pub access_group: Option<String>,
    pub grace_period_seconds: u32,
    subnet_ids: Vec<String>,
    image_id: Value,
    group_id: Option<Value>,
    instance_profile: Option<Value>,
    user_data: Option<String>,
    block_devices: Vec<BlockDeviceConfig>,
    registrations: Vec<Registration>,
    scaling: Option<ScalingConfig>,
}

impl ScalablePool {
    /// Declare a pool placed in every subnet of the given type
    pub fn new(
        logical_id: impl Into<String>,
        network: &NetworkBoundary,
        placement: SubnetType,
        capacity: Capacity,
        image_id: Value,
    ) -> Result<Self, StackError> {
        let subnet_ids: Vec<String> = network
            .subnets_of_type(placement)
            .map(|s| s.logical_id.clone())
            .collect();
        if subnet_ids.is_empty() {
            return Err(StackError::Placement {
                placement: placement.to_string(),
                network: network.logical_id.clone(),
            });
        }

        Ok(Self {
            logical_id: logical_id.into(),
            network: network.logical_id.clone(),
            placement,
            capacity,
            instance_type: "t2.micro".to_string(),
            key_name: None,
            access_group: None,
            grace_period_seconds: 300,
            subnet_ids,
            image_id,
            group_id: None,
            instance_profile: None,
            user_data: None,
            block_devices: Vec::new(),
            registrations: Vec::new(),
            scaling: None,
        })
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = instance_type.into();
        self
    }

    pub fn with_key_name(mut self, key_name: Option<String>) -> Self {
        self.key_name = key_name;
        self
    }

    pub fn with_access_group(mut self, group: &AccessGroup) -> Self {
        self.access_group = Some(group.logical_id.clone());
        self.group_id = Some(group.group_id());
        self
    }

    pub fn with_role(mut self, role: &ComputeRole) -> Self {
        self.instance_profile = Some(role.instance_profile_arn());
        self
    }

    /// Boot script run once by every instance
    pub fn with_user_data(mut self, script: impl Into<String>) -> Self {
        self.user_data = Some(script.into());
        self
    }

    pub fn with_block_devices(mut self, devices: Vec<BlockDeviceConfig>) -> Self {
        self.block_devices = devices;
        self
    }

    pub fn with_grace_period(mut self, seconds: u32) -> Self {
        self.grace_period_seconds = seconds;
        self
    }

    /// Register every instance of the pool with a target group
    pub fn register_with(&mut self, target_group: &TargetGroup) -> &mut Self {
        self.registrations.push(Registration {
            target_group: target_group.logical_id.clone(),
            load_balancer: target_group.load_balancer.clone(),
        });
        self
    }

    /// Attach a target-tracking scaling policy
    ///
    /// Request-count tracking needs a target group registration to scope the metric.
    pub fn with_scaling(&mut self, scaling: ScalingConfig) -> Result<&mut Self, StackError> {
        if scaling.target_value == 0 {
            return Err(StackError::Scaling("target value must be positive".to_string()));
        }
        if scaling.metric == ScalingMetric::RequestCountPerTarget && self.registrations.is_empty() {
            return Err(StackError::Scaling(
                "request_count_per_target requires the pool to be registered with a target group"
                    .to_string(),
            ));
        }
        self.scaling = Some(scaling);
        Ok(self)
    }

    pub fn subnet_ids(&self) -> &[String] {
        &self.subnet_ids
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn is_registered_with(&self, target_group: &str) -> bool {
        self.registrations.iter().any(|r| r.target_group == target_group)
    }

    pub fn scaling(&self) -> Option<&ScalingConfig> {
        self.scaling.as_ref()
    }

    pub fn user_data(&self) -> Option<&str> {
        self.user_data.as_deref()
    }

    pub fn launch_template_id(&self) -> String {
        format!("{}LaunchTemplate", self.logical_id)
    }

    pub fn resources(&self) -> Vec<Resource> {
        let template_id = self.launch_template_id();
        let mut resources = vec![self.launch_template(&template_id), self.group(&template_id)];
        if let Some(policy) = self.scaling_policy() {
            resources.push(policy);
        }
        resources
    }

    fn launch_template(&self, template_id: &str) -> Resource {
        let mut data = vec![
            ("image_id", self.image_id.clone()),
            ("instance_type", Value::from(self.instance_type.as_str())),
        ];
        if let Some(key) = &self.key_name {
            data.push(("key_name", Value::from(key.as_str())));
        }
        if let Some(profile) = &self.instance_profile {
            data.push(("iam_instance_profile", Value::map([("arn", profile.clone())])));
        }
        if let Some(group) = &self.group_id {
            data.push(("security_group_ids", Value::List(vec![group.clone()])));
        }
        if let Some(script) = &self.user_data {
            data.push((
                "user_data",
                Value::Base64(Box::new(Value::from(script.as_str()))),
            ));
        }
        if !self.block_devices.is_empty() {
            let mappings = self
                .block_devices
                .iter()
                .map(|device| {
                    Value::map([
                        ("device_name", Value::from(device.device_name.as_str())),
                        (
                            "ebs",
                            Value::map([
                                ("volume_size", Value::Int(i64::from(device.volume_size_gib))),
                                ("volume_type", Value::from(device.volume_type.as_str())),
                                (
                                    "delete_on_termination",
                                    Value::Bool(device.delete_on_termination),
                                ),
                            ]),
                        ),
                    ])
                })
                .collect();
            data.push(("block_device_mappings", Value::List(mappings)));
        }

        Resource::new(rt::LAUNCH_TEMPLATE, template_id)
            .with_attribute("launch_template_data", Value::map(data))
    }

    fn group(&self, template_id: &str) -> Resource {
        let mut group = Resource::new(rt::AUTO_SCALING_GROUP, &self.logical_id)
            .with_attribute("min_size", self.capacity.min.to_string())
            .with_attribute("max_size", self.capacity.max.to_string())
            .with_attribute("desired_capacity", self.capacity.desired.to_string())
            .with_attribute(
                "launch_template",
                Value::map([
                    ("launch_template_id", Value::Ref(template_id.to_string())),
                    (
                        "version",
                        Value::attr(template_id, "LatestVersionNumber"),
                    ),
                ]),
            )
            .with_attribute(
                "vpc_zone_identifier",
                Value::List(
                    self.subnet_ids
                        .iter()
                        .map(|id| Value::Ref(id.clone()))
                        .collect(),
                ),
            )
            .with_attribute(
                "tags",
                Value::map([("Name", Value::from(self.logical_id.as_str()))]),
            );

        if !self.registrations.is_empty() {
            group = group
                .with_attribute(
                    "target_group_arns",
                    Value::List(
                        self.registrations
                            .iter()
                            .map(|r| Value::Ref(r.target_group.clone()))
                            .collect(),
                    ),
                )
                .with_attribute("health_check_type", "ELB")
                .with_attribute(
                    "health_check_grace_period",
                    Value::Int(i64::from(self.grace_period_seconds)),
                );
        }
        group
    }

    fn scaling_policy(&self) -> Option<Resource> {
        let scaling = self.scaling.as_ref()?;
        let metric = match scaling.metric {
            ScalingMetric::CpuUtilization => {
                Value::map([("predefined_metric_type", Value::from("ASGAverageCPUUtilization"))])
            }
            ScalingMetric::RequestCountPerTarget => {
                let registration = self.registrations.first()?;
                Value::map([
                    ("predefined_metric_type", Value::from("ALBRequestCountPerTarget")),
                    (
                        "resource_label",
                        Value::Join(
                            "/".to_string(),
                            vec![
                                Value::attr(&registration.load_balancer, "LoadBalancerFullName"),
                                Value::attr(&registration.target_group, "TargetGroupFullName"),
                            ],
                        ),
                    ),
                ])
            }
        };

        Some(
            Resource::new(rt::SCALING_POLICY, format!("{}ScalingPolicy", self.logical_id))
                .with_attribute("auto_scaling_group_name", Value::Ref(self.logical_id.clone()))
                .with_attribute("policy_type", "TargetTrackingScaling")
                .with_attribute(
                    "target_tracking_configuration",
                    Value::map([
                        ("predefined_metric_specification", metric),
                        ("target_value", Value::Int(i64::from(scaling.target_value))),
                    ]),
                )
                .with_attribute(
                    "estimated_instance_warmup",
                    Value::Int(i64::from(scaling.warmup_seconds)),
                ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealthCheckConfig, NetworkConfig};
    use crate::load_balancer::LoadBalancer;

    fn network() -> NetworkBoundary {
        NetworkBoundary::declare("Test", &NetworkConfig::default()).unwrap()
    }

    fn pool(network: &NetworkBoundary) -> ScalablePool {
        ScalablePool::new(
            "Pool",
            network,
            SubnetType::Public,
            Capacity::new(2, 2, 4).unwrap(),
            Value::Ref("MachineImageId".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn capacity_bounds() {
        assert!(Capacity::new(2, 2, 4).is_ok());
        assert!(Capacity::new(0, 0, 0).is_ok());
        assert!(matches!(
            Capacity::new(2, 5, 4),
            Err(StackError::CapacityBounds {
                min: 2,
                desired: 5,
                max: 4
            })
        ));
        assert!(Capacity::new(3, 2, 4).is_err());
    }

    #[test]
    fn machine_image_parsing() {
        assert_eq!(MachineImage::parse("amazon-linux-2").unwrap(), MachineImage::AmazonLinux2);
        assert_eq!(
            MachineImage::parse("ami-0abc").unwrap(),
            MachineImage::Ami("ami-0abc".to_string())
        );
        assert!(MachineImage::parse("ubuntu").is_err());
        assert_eq!(MachineImage::Ami("ami-1".into()).ssm_parameter(), None);
    }

    #[test]
    fn private_placement_in_public_network_is_rejected() {
        let result = ScalablePool::new(
            "Pool",
            &network(),
            SubnetType::Private,
            Capacity::new(2, 2, 2).unwrap(),
            Value::from("ami-123"),
        );
        assert!(matches!(result, Err(StackError::Placement { .. })));
    }

    #[test]
    fn group_renders_sizes_as_strings_and_spans_placement() {
        let network = network();
        let resources = pool(&network).resources();
        assert_eq!(resources.len(), 2);

        let group = &resources[1];
        assert_eq!(group.attributes["min_size"], Value::from("2"));
        assert_eq!(group.attributes["max_size"], Value::from("4"));
        assert_eq!(group.attributes["desired_capacity"], Value::from("2"));
        assert_eq!(
            group.attributes["vpc_zone_identifier"],
            Value::List(vec![
                Value::Ref("TestPublicSubnet1".to_string()),
                Value::Ref("TestPublicSubnet2".to_string()),
            ])
        );
        assert!(!group.attributes.contains_key("target_group_arns"));
    }

    #[test]
    fn registration_enables_elb_health_checks() {
        let network = network();
        let group = AccessGroup::new("LbSg", &network, "lb", true);
        let mut lb = LoadBalancer::new("Alb", &network, &group);
        let tg = lb.add_target_group("Tg", 80, HealthCheckConfig::default()).clone();

        let mut pool = pool(&network);
        pool.register_with(&tg);
        assert!(pool.is_registered_with("Tg"));

        let resources = pool.resources();
        let asg = &resources[1];
        assert_eq!(
            asg.attributes["target_group_arns"],
            Value::List(vec![Value::Ref("Tg".to_string())])
        );
        assert_eq!(asg.attributes["health_check_type"], Value::from("ELB"));
    }

    #[test]
    fn user_data_is_base64_encoded() {
        let network = network();
        let pool = pool(&network).with_user_data("#!/bin/bash\necho hi\n");
        let resources = pool.resources();
        let Value::Map(data) = &resources[0].attributes["launch_template_data"] else {
            panic!("Expected launch template data");
        };
        assert_eq!(
            data["user_data"],
            Value::Base64(Box::new(Value::from("#!/bin/bash\necho hi\n")))
        );
    }

    #[test]
    fn request_count_scaling_needs_registration() {
        let network = network();
        let mut unregistered = pool(&network);
        let scaling = ScalingConfig {
            metric: ScalingMetric::RequestCountPerTarget,
            target_value: 100,
            warmup_seconds: 120,
        };
        assert!(matches!(
            unregistered.with_scaling(scaling.clone()),
            Err(StackError::Scaling(_))
        ));

        let group = AccessGroup::new("LbSg", &network, "lb", true);
        let mut lb = LoadBalancer::new("Alb", &network, &group);
        let tg = lb.add_target_group("Tg", 80, HealthCheckConfig::default()).clone();
        let mut pool = pool(&network);
        pool.register_with(&tg);
        pool.with_scaling(scaling).unwrap();

        let resources = pool.resources();
        assert_eq!(resources.len(), 3);
        let policy = &resources[2];
        assert_eq!(policy.logical_id(), "PoolScalingPolicy");
        assert_eq!(policy.dependencies(), vec!["Alb", "Pool", "Tg"]);
    }
}
