//! Security group resource schema definitions

use streamline_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;
use crate::resources as rt;

/// Inline rule of a security group
fn rule_schema() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("ip_protocol", aws_types::ip_protocol()).required(),
        AttributeSchema::new("from_port", aws_types::rule_port()),
        AttributeSchema::new("to_port", aws_types::rule_port()),
        AttributeSchema::new("cidr_ip", types::cidr()),
        AttributeSchema::new("description", AttributeType::String),
    ])
}

/// Returns the schema for Security Group
pub fn security_group_schema() -> ResourceSchema {
    ResourceSchema::new(rt::SECURITY_GROUP)
        .with_description("An AWS VPC Security Group")
        .attribute(
            AttributeSchema::new("group_description", AttributeType::String)
                .required()
                .with_description("Description of the Security Group"),
        )
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(
            AttributeSchema::new(
                "security_group_ingress",
                AttributeType::List(Box::new(rule_schema())),
            )
            .with_description("Inbound rules with CIDR sources"),
        )
        .attribute(
            AttributeSchema::new(
                "security_group_egress",
                AttributeType::List(Box::new(rule_schema())),
            )
            .with_description("Outbound rules"),
        )
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for a standalone Security Group ingress rule
pub fn security_group_ingress_schema() -> ResourceSchema {
    ResourceSchema::new(rt::SECURITY_GROUP_INGRESS)
        .with_description("An inbound rule of a Security Group, usually from a peer group")
        .attribute(AttributeSchema::new("group_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("ip_protocol", aws_types::ip_protocol()).required())
        .attribute(AttributeSchema::new("from_port", aws_types::rule_port()))
        .attribute(AttributeSchema::new("to_port", aws_types::rule_port()))
        .attribute(AttributeSchema::new("source_security_group_id", AttributeType::String))
        .attribute(AttributeSchema::new("cidr_ip", types::cidr()))
        .attribute(AttributeSchema::new("description", AttributeType::String))
}
