//! Resource type configurations for CloudFormation rendering
//!
//! This module defines:
//! - Resource type definitions (implementing ResourceType trait)
//! - Mapping between Streamline resource types and CloudFormation resource types

use streamline_core::provider::ResourceType;
use streamline_core::schema::ResourceSchema;

use crate::schemas;

// =============================================================================
// Resource Type Names
// =============================================================================

pub const VPC: &str = "ec2.vpc";
pub const SUBNET: &str = "ec2.subnet";
pub const INTERNET_GATEWAY: &str = "ec2.internet_gateway";
pub const VPC_GATEWAY_ATTACHMENT: &str = "ec2.vpc_gateway_attachment";
pub const ROUTE_TABLE: &str = "ec2.route_table";
pub const ROUTE: &str = "ec2.route";
pub const SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "ec2.subnet_route_table_association";
pub const EIP: &str = "ec2.eip";
pub const NAT_GATEWAY: &str = "ec2.nat_gateway";
pub const SECURITY_GROUP: &str = "ec2.security_group";
pub const SECURITY_GROUP_INGRESS: &str = "ec2.security_group_ingress";
pub const LAUNCH_TEMPLATE: &str = "ec2.launch_template";
pub const ROLE: &str = "iam.role";
pub const INSTANCE_PROFILE: &str = "iam.instance_profile";
pub const LOAD_BALANCER: &str = "elbv2.load_balancer";
pub const LISTENER: &str = "elbv2.listener";
pub const TARGET_GROUP: &str = "elbv2.target_group";
pub const AUTO_SCALING_GROUP: &str = "autoscaling.auto_scaling_group";
pub const SCALING_POLICY: &str = "autoscaling.scaling_policy";

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(VpcType, VPC, schemas::network::vpc_schema);
define_resource_type!(SubnetType, SUBNET, schemas::network::subnet_schema);
define_resource_type!(
    InternetGatewayType,
    INTERNET_GATEWAY,
    schemas::network::internet_gateway_schema
);
define_resource_type!(
    VpcGatewayAttachmentType,
    VPC_GATEWAY_ATTACHMENT,
    schemas::network::vpc_gateway_attachment_schema
);
define_resource_type!(RouteTableType, ROUTE_TABLE, schemas::network::route_table_schema);
define_resource_type!(RouteType, ROUTE, schemas::network::route_schema);
define_resource_type!(
    SubnetRouteTableAssociationType,
    SUBNET_ROUTE_TABLE_ASSOCIATION,
    schemas::network::subnet_route_table_association_schema
);
define_resource_type!(EipType, EIP, schemas::network::eip_schema);
define_resource_type!(NatGatewayType, NAT_GATEWAY, schemas::network::nat_gateway_schema);
define_resource_type!(
    SecurityGroupType,
    SECURITY_GROUP,
    schemas::access::security_group_schema
);
define_resource_type!(
    SecurityGroupIngressType,
    SECURITY_GROUP_INGRESS,
    schemas::access::security_group_ingress_schema
);
define_resource_type!(
    LaunchTemplateType,
    LAUNCH_TEMPLATE,
    schemas::autoscaling::launch_template_schema
);
define_resource_type!(RoleType, ROLE, schemas::iam::role_schema);
define_resource_type!(
    InstanceProfileType,
    INSTANCE_PROFILE,
    schemas::iam::instance_profile_schema
);
define_resource_type!(LoadBalancerType, LOAD_BALANCER, schemas::elb::load_balancer_schema);
define_resource_type!(ListenerType, LISTENER, schemas::elb::listener_schema);
define_resource_type!(TargetGroupType, TARGET_GROUP, schemas::elb::target_group_schema);
define_resource_type!(
    AutoScalingGroupType,
    AUTO_SCALING_GROUP,
    schemas::autoscaling::auto_scaling_group_schema
);
define_resource_type!(
    ScalingPolicyType,
    SCALING_POLICY,
    schemas::autoscaling::scaling_policy_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(VpcType),
        Box::new(SubnetType),
        Box::new(InternetGatewayType),
        Box::new(VpcGatewayAttachmentType),
        Box::new(RouteTableType),
        Box::new(RouteType),
        Box::new(SubnetRouteTableAssociationType),
        Box::new(EipType),
        Box::new(NatGatewayType),
        Box::new(SecurityGroupType),
        Box::new(SecurityGroupIngressType),
        Box::new(LaunchTemplateType),
        Box::new(RoleType),
        Box::new(InstanceProfileType),
        Box::new(LoadBalancerType),
        Box::new(ListenerType),
        Box::new(TargetGroupType),
        Box::new(AutoScalingGroupType),
        Box::new(ScalingPolicyType),
    ]
}

// =============================================================================
// Resource Configuration
// =============================================================================

/// Attribute mapping: (streamline_name, cloudformation_name)
pub type AttrMapping = (&'static str, &'static str);

/// How a resource type renders its `tags` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStyle {
    /// The type does not accept tags
    None,
    /// `[{ "Key": k, "Value": v }]`
    KeyValue,
    /// `[{ "Key": k, "Value": v, "PropagateAtLaunch": true }]`
    Propagating,
}

/// Resource type configuration
pub struct ResourceConfig {
    /// CloudFormation type name (e.g., "AWS::EC2::VPC")
    pub aws_type_name: &'static str,
    /// Attribute mappings (Streamline name -> CloudFormation name)
    pub attributes: &'static [AttrMapping],
    pub tags: TagStyle,
}

impl ResourceConfig {
    /// CloudFormation property name of an attribute
    pub fn property_name(&self, attribute: &str) -> Option<&'static str> {
        self.attributes
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, aws)| *aws)
    }
}

// =============================================================================
// VPC Resources
// =============================================================================

pub const VPC_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::VPC",
    attributes: &[
        ("cidr_block", "CidrBlock"),
        ("enable_dns_hostnames", "EnableDnsHostnames"),
        ("enable_dns_support", "EnableDnsSupport"),
        ("instance_tenancy", "InstanceTenancy"),
    ],
    tags: TagStyle::KeyValue,
};

pub const SUBNET_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::Subnet",
    attributes: &[
        ("vpc_id", "VpcId"),
        ("cidr_block", "CidrBlock"),
        ("availability_zone", "AvailabilityZone"),
        ("map_public_ip_on_launch", "MapPublicIpOnLaunch"),
    ],
    tags: TagStyle::KeyValue,
};

pub const INTERNET_GATEWAY_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::InternetGateway",
    attributes: &[],
    tags: TagStyle::KeyValue,
};

pub const VPC_GATEWAY_ATTACHMENT_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::VPCGatewayAttachment",
    attributes: &[
        ("vpc_id", "VpcId"),
        ("internet_gateway_id", "InternetGatewayId"),
    ],
    tags: TagStyle::None,
};

// =============================================================================
// Route Resources
// =============================================================================

pub const ROUTE_TABLE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::RouteTable",
    attributes: &[("vpc_id", "VpcId")],
    tags: TagStyle::KeyValue,
};

pub const ROUTE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::Route",
    attributes: &[
        ("route_table_id", "RouteTableId"),
        ("destination_cidr_block", "DestinationCidrBlock"),
        ("gateway_id", "GatewayId"),
        ("nat_gateway_id", "NatGatewayId"),
    ],
    tags: TagStyle::None,
};

pub const SUBNET_ROUTE_TABLE_ASSOCIATION_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::SubnetRouteTableAssociation",
    attributes: &[
        ("subnet_id", "SubnetId"),
        ("route_table_id", "RouteTableId"),
    ],
    tags: TagStyle::None,
};

// =============================================================================
// NAT Resources
// =============================================================================

pub const EIP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::EIP",
    attributes: &[("domain", "Domain")],
    tags: TagStyle::KeyValue,
};

pub const NAT_GATEWAY_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::NatGateway",
    attributes: &[
        ("subnet_id", "SubnetId"),
        ("allocation_id", "AllocationId"),
    ],
    tags: TagStyle::KeyValue,
};

// =============================================================================
// Security Group Resources
// =============================================================================

pub const SECURITY_GROUP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::SecurityGroup",
    attributes: &[
        ("group_description", "GroupDescription"),
        ("vpc_id", "VpcId"),
        ("security_group_ingress", "SecurityGroupIngress"),
        ("security_group_egress", "SecurityGroupEgress"),
    ],
    tags: TagStyle::KeyValue,
};

pub const SECURITY_GROUP_INGRESS_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::SecurityGroupIngress",
    attributes: &[
        ("group_id", "GroupId"),
        ("ip_protocol", "IpProtocol"),
        ("from_port", "FromPort"),
        ("to_port", "ToPort"),
        ("source_security_group_id", "SourceSecurityGroupId"),
        ("cidr_ip", "CidrIp"),
        ("description", "Description"),
    ],
    tags: TagStyle::None,
};

// =============================================================================
// IAM Resources
// =============================================================================

pub const ROLE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::IAM::Role",
    attributes: &[
        ("assume_role_policy_document", "AssumeRolePolicyDocument"),
        ("managed_policy_arns", "ManagedPolicyArns"),
        ("description", "Description"),
    ],
    tags: TagStyle::KeyValue,
};

pub const INSTANCE_PROFILE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::IAM::InstanceProfile",
    attributes: &[("roles", "Roles")],
    tags: TagStyle::None,
};

// =============================================================================
// Load Balancing Resources
// =============================================================================

pub const LOAD_BALANCER_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::ElasticLoadBalancingV2::LoadBalancer",
    attributes: &[
        ("name", "Name"),
        ("scheme", "Scheme"),
        ("type", "Type"),
        ("subnets", "Subnets"),
        ("security_groups", "SecurityGroups"),
    ],
    tags: TagStyle::KeyValue,
};

pub const LISTENER_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::ElasticLoadBalancingV2::Listener",
    attributes: &[
        ("load_balancer_arn", "LoadBalancerArn"),
        ("port", "Port"),
        ("protocol", "Protocol"),
        ("certificates", "Certificates"),
        ("default_actions", "DefaultActions"),
    ],
    tags: TagStyle::None,
};

pub const TARGET_GROUP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::ElasticLoadBalancingV2::TargetGroup",
    attributes: &[
        ("port", "Port"),
        ("protocol", "Protocol"),
        ("vpc_id", "VpcId"),
        ("target_type", "TargetType"),
        ("health_check_enabled", "HealthCheckEnabled"),
        ("health_check_path", "HealthCheckPath"),
        ("health_check_port", "HealthCheckPort"),
        ("health_check_protocol", "HealthCheckProtocol"),
        ("health_check_interval_seconds", "HealthCheckIntervalSeconds"),
        ("healthy_threshold_count", "HealthyThresholdCount"),
        ("unhealthy_threshold_count", "UnhealthyThresholdCount"),
        ("matcher", "Matcher"),
    ],
    tags: TagStyle::KeyValue,
};

// =============================================================================
// Compute Resources
// =============================================================================

pub const LAUNCH_TEMPLATE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::LaunchTemplate",
    attributes: &[("launch_template_data", "LaunchTemplateData")],
    tags: TagStyle::None,
};

pub const AUTO_SCALING_GROUP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::AutoScaling::AutoScalingGroup",
    attributes: &[
        ("min_size", "MinSize"),
        ("max_size", "MaxSize"),
        ("desired_capacity", "DesiredCapacity"),
        ("launch_template", "LaunchTemplate"),
        ("vpc_zone_identifier", "VPCZoneIdentifier"),
        ("target_group_arns", "TargetGroupARNs"),
        ("health_check_type", "HealthCheckType"),
        ("health_check_grace_period", "HealthCheckGracePeriod"),
    ],
    tags: TagStyle::Propagating,
};

pub const SCALING_POLICY_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::AutoScaling::ScalingPolicy",
    attributes: &[
        ("auto_scaling_group_name", "AutoScalingGroupName"),
        ("policy_type", "PolicyType"),
        ("target_tracking_configuration", "TargetTrackingConfiguration"),
        ("estimated_instance_warmup", "EstimatedInstanceWarmup"),
    ],
    tags: TagStyle::None,
};

/// Get the ResourceConfig for a Streamline resource type
pub fn config_for(resource_type: &str) -> Option<&'static ResourceConfig> {
    match resource_type {
        VPC => Some(&VPC_CONFIG),
        SUBNET => Some(&SUBNET_CONFIG),
        INTERNET_GATEWAY => Some(&INTERNET_GATEWAY_CONFIG),
        VPC_GATEWAY_ATTACHMENT => Some(&VPC_GATEWAY_ATTACHMENT_CONFIG),
        ROUTE_TABLE => Some(&ROUTE_TABLE_CONFIG),
        ROUTE => Some(&ROUTE_CONFIG),
        SUBNET_ROUTE_TABLE_ASSOCIATION => Some(&SUBNET_ROUTE_TABLE_ASSOCIATION_CONFIG),
        EIP => Some(&EIP_CONFIG),
        NAT_GATEWAY => Some(&NAT_GATEWAY_CONFIG),
        SECURITY_GROUP => Some(&SECURITY_GROUP_CONFIG),
        SECURITY_GROUP_INGRESS => Some(&SECURITY_GROUP_INGRESS_CONFIG),
        LAUNCH_TEMPLATE => Some(&LAUNCH_TEMPLATE_CONFIG),
        ROLE => Some(&ROLE_CONFIG),
        INSTANCE_PROFILE => Some(&INSTANCE_PROFILE_CONFIG),
        LOAD_BALANCER => Some(&LOAD_BALANCER_CONFIG),
        LISTENER => Some(&LISTENER_CONFIG),
        TARGET_GROUP => Some(&TARGET_GROUP_CONFIG),
        AUTO_SCALING_GROUP => Some(&AUTO_SCALING_GROUP_CONFIG),
        SCALING_POLICY => Some(&SCALING_POLICY_CONFIG),
        _ => None,
    }
}
