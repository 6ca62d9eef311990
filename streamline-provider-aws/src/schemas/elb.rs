//! Elastic Load Balancing v2 resource schema definitions

use streamline_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;
use crate::resources as rt;

fn action_schema() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new(
            "type",
            AttributeType::Enum(vec![
                "forward".to_string(),
                "fixed-response".to_string(),
                "redirect".to_string(),
            ]),
        )
        .required(),
        AttributeSchema::new("target_group_arn", AttributeType::String),
        AttributeSchema::new(
            "forward_config",
            AttributeType::Struct(vec![
                AttributeSchema::new(
                    "target_groups",
                    AttributeType::List(Box::new(AttributeType::Struct(vec![
                        AttributeSchema::new("target_group_arn", AttributeType::String).required(),
                    ]))),
                )
                .required(),
            ]),
        ),
        AttributeSchema::new(
            "fixed_response_config",
            AttributeType::Struct(vec![
                AttributeSchema::new("status_code", AttributeType::String).required(),
                AttributeSchema::new("content_type", AttributeType::String),
                AttributeSchema::new("message_body", AttributeType::String),
            ]),
        ),
        AttributeSchema::new(
            "redirect_config",
            AttributeType::Struct(vec![
                AttributeSchema::new("protocol", AttributeType::String),
                AttributeSchema::new("port", AttributeType::String),
                AttributeSchema::new("status_code", AttributeType::String).required(),
            ]),
        ),
    ])
}

/// Returns the schema for Application Load Balancer
pub fn load_balancer_schema() -> ResourceSchema {
    ResourceSchema::new(rt::LOAD_BALANCER)
        .with_description("An Application Load Balancer")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .with_description("Physical name; generated by the provider when omitted"),
        )
        .attribute(AttributeSchema::new(
            "scheme",
            AttributeType::Enum(vec!["internet-facing".to_string(), "internal".to_string()]),
        ))
        .attribute(AttributeSchema::new(
            "type",
            AttributeType::Enum(vec!["application".to_string()]),
        ))
        .attribute(AttributeSchema::new("subnets", types::string_list()).required())
        .attribute(AttributeSchema::new("security_groups", types::string_list()))
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for Listener
pub fn listener_schema() -> ResourceSchema {
    ResourceSchema::new(rt::LISTENER)
        .with_description("A port-specific forwarding rule of a load balancer")
        .attribute(AttributeSchema::new("load_balancer_arn", AttributeType::String).required())
        .attribute(AttributeSchema::new("port", aws_types::port_number()).required())
        .attribute(AttributeSchema::new("protocol", aws_types::application_protocol()).required())
        .attribute(AttributeSchema::new(
            "certificates",
            AttributeType::List(Box::new(AttributeType::Struct(vec![
                AttributeSchema::new("certificate_arn", aws_types::arn()).required(),
            ]))),
        ))
        .attribute(
            AttributeSchema::new("default_actions", AttributeType::List(Box::new(action_schema())))
                .required(),
        )
}

/// Returns the schema for Target Group
pub fn target_group_schema() -> ResourceSchema {
    ResourceSchema::new(rt::TARGET_GROUP)
        .with_description("A pool of load balancer targets")
        .attribute(AttributeSchema::new("port", aws_types::port_number()).required())
        .attribute(AttributeSchema::new("protocol", aws_types::application_protocol()).required())
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "target_type",
            AttributeType::Enum(vec!["instance".to_string(), "ip".to_string()]),
        ))
        .attribute(AttributeSchema::new("health_check_enabled", AttributeType::Bool))
        .attribute(AttributeSchema::new("health_check_path", AttributeType::String))
        .attribute(AttributeSchema::new("health_check_port", AttributeType::String))
        .attribute(AttributeSchema::new(
            "health_check_protocol",
            aws_types::application_protocol(),
        ))
        .attribute(AttributeSchema::new(
            "health_check_interval_seconds",
            types::positive_int(),
        ))
        .attribute(AttributeSchema::new("healthy_threshold_count", types::positive_int()))
        .attribute(AttributeSchema::new("unhealthy_threshold_count", types::positive_int()))
        .attribute(AttributeSchema::new(
            "matcher",
            AttributeType::Struct(vec![
                AttributeSchema::new("http_code", AttributeType::String).required(),
            ]),
        ))
        .attribute(AttributeSchema::new("tags", types::tags()))
}
