//! VPC, subnet and routing resource schema definitions
//!
//! Based on the CloudFormation AWS::EC2 resource types.
//! See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/AWS_EC2.html

use streamline_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::resources as rt;

/// Returns the schema for VPC
pub fn vpc_schema() -> ResourceSchema {
    ResourceSchema::new(rt::VPC)
        .with_description("An AWS VPC (Virtual Private Cloud)")
        .attribute(
            AttributeSchema::new("cidr_block", types::cidr())
                .required()
                .with_description("The IPv4 network range for the VPC, in CIDR notation"),
        )
        .attribute(
            AttributeSchema::new("enable_dns_hostnames", AttributeType::Bool)
                .with_description("Indicates whether instances launched in the VPC get DNS hostnames"),
        )
        .attribute(
            AttributeSchema::new("enable_dns_support", AttributeType::Bool)
                .with_description("Indicates whether DNS resolution is supported for the VPC"),
        )
        .attribute(
            AttributeSchema::new(
                "instance_tenancy",
                AttributeType::Enum(vec![
                    "default".to_string(),
                    "dedicated".to_string(),
                    "host".to_string(),
                ]),
            )
            .with_description("The allowed tenancy of instances launched into the VPC"),
        )
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for Subnet
pub fn subnet_schema() -> ResourceSchema {
    ResourceSchema::new(rt::SUBNET)
        .with_description("An AWS VPC Subnet")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("cidr_block", types::cidr()).required())
        .attribute(
            AttributeSchema::new("availability_zone", AttributeType::String)
                .with_description("The availability zone for the subnet"),
        )
        .attribute(
            AttributeSchema::new("map_public_ip_on_launch", AttributeType::Bool)
                .with_description("Whether instances launched in the subnet receive a public IPv4 address"),
        )
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for Internet Gateway
pub fn internet_gateway_schema() -> ResourceSchema {
    ResourceSchema::new(rt::INTERNET_GATEWAY)
        .with_description("An AWS Internet Gateway")
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for VPC Gateway Attachment
pub fn vpc_gateway_attachment_schema() -> ResourceSchema {
    ResourceSchema::new(rt::VPC_GATEWAY_ATTACHMENT)
        .with_description("Attaches an Internet Gateway to a VPC")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("internet_gateway_id", AttributeType::String).required())
}

/// Returns the schema for Route Table
pub fn route_table_schema() -> ResourceSchema {
    ResourceSchema::new(rt::ROUTE_TABLE)
        .with_description("An AWS VPC Route Table")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for Route
pub fn route_schema() -> ResourceSchema {
    ResourceSchema::new(rt::ROUTE)
        .with_description("A route in a VPC Route Table")
        .attribute(AttributeSchema::new("route_table_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("destination_cidr_block", types::cidr()).required())
        .attribute(
            AttributeSchema::new("gateway_id", AttributeType::String)
                .with_description("Internet Gateway target"),
        )
        .attribute(
            AttributeSchema::new("nat_gateway_id", AttributeType::String)
                .with_description("NAT Gateway target"),
        )
}

/// Returns the schema for Subnet Route Table Association
pub fn subnet_route_table_association_schema() -> ResourceSchema {
    ResourceSchema::new(rt::SUBNET_ROUTE_TABLE_ASSOCIATION)
        .with_description("Associates a subnet with a route table")
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("route_table_id", AttributeType::String).required())
}

/// Returns the schema for Elastic IP
pub fn eip_schema() -> ResourceSchema {
    ResourceSchema::new(rt::EIP)
        .with_description("An Elastic IP address")
        .attribute(AttributeSchema::new(
            "domain",
            AttributeType::Enum(vec!["vpc".to_string(), "standard".to_string()]),
        ))
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for NAT Gateway
pub fn nat_gateway_schema() -> ResourceSchema {
    ResourceSchema::new(rt::NAT_GATEWAY)
        .with_description("A public NAT Gateway")
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("allocation_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("tags", types::tags()))
}
