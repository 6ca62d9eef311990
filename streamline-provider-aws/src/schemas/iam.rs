//! IAM resource schema definitions

use streamline_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::resources as rt;

fn policy_document() -> AttributeType {
    let principal = AttributeType::Struct(vec![
        AttributeSchema::new("service", AttributeType::String).required(),
    ]);
    let statement = AttributeType::Struct(vec![
        AttributeSchema::new(
            "effect",
            AttributeType::Enum(vec!["Allow".to_string(), "Deny".to_string()]),
        )
        .required(),
        AttributeSchema::new("principal", principal).required(),
        AttributeSchema::new("action", AttributeType::String).required(),
    ]);
    AttributeType::Struct(vec![
        AttributeSchema::new("version", AttributeType::String).required(),
        AttributeSchema::new("statement", AttributeType::List(Box::new(statement))).required(),
    ])
}

/// Returns the schema for IAM Role
pub fn role_schema() -> ResourceSchema {
    ResourceSchema::new(rt::ROLE)
        .with_description("An IAM role assumed by a service")
        .attribute(
            AttributeSchema::new("assume_role_policy_document", policy_document())
                .required()
                .with_description("Trust policy naming who may assume the role"),
        )
        .attribute(
            AttributeSchema::new("managed_policy_arns", types::string_list())
                .with_description("Managed policies attached to the role"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for IAM Instance Profile
pub fn instance_profile_schema() -> ResourceSchema {
    ResourceSchema::new(rt::INSTANCE_PROFILE)
        .with_description("Passes an IAM role to EC2 instances")
        .attribute(AttributeSchema::new("roles", types::string_list()).required())
}
