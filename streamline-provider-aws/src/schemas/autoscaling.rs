//! Launch template and Auto Scaling resource schema definitions

use streamline_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as aws_types;
use crate::resources as rt;

fn block_device_mapping() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("device_name", AttributeType::String).required(),
        AttributeSchema::new(
            "ebs",
            AttributeType::Struct(vec![
                AttributeSchema::new("volume_size", types::positive_int()).required(),
                AttributeSchema::new(
                    "volume_type",
                    AttributeType::Enum(
                        ["gp2", "gp3", "io1", "io2", "st1", "sc1", "standard"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                ),
                AttributeSchema::new("delete_on_termination", AttributeType::Bool),
            ]),
        )
        .required(),
    ])
}

fn launch_template_data() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("image_id", AttributeType::String).required(),
        AttributeSchema::new("instance_type", aws_types::instance_type()).required(),
        AttributeSchema::new("key_name", AttributeType::String),
        AttributeSchema::new(
            "iam_instance_profile",
            AttributeType::Struct(vec![
                AttributeSchema::new("arn", AttributeType::String).required(),
            ]),
        ),
        AttributeSchema::new("security_group_ids", types::string_list()),
        AttributeSchema::new("user_data", AttributeType::String),
        AttributeSchema::new(
            "block_device_mappings",
            AttributeType::List(Box::new(block_device_mapping())),
        ),
    ])
}

/// Returns the schema for Launch Template
pub fn launch_template_schema() -> ResourceSchema {
    ResourceSchema::new(rt::LAUNCH_TEMPLATE)
        .with_description("Launch parameters shared by every instance of a pool")
        .attribute(AttributeSchema::new("launch_template_data", launch_template_data()).required())
}

/// Returns the schema for Auto Scaling Group
pub fn auto_scaling_group_schema() -> ResourceSchema {
    ResourceSchema::new(rt::AUTO_SCALING_GROUP)
        .with_description("A pool of homogeneous EC2 instances kept within a capacity range")
        .attribute(AttributeSchema::new("min_size", aws_types::numeric_string()).required())
        .attribute(AttributeSchema::new("max_size", aws_types::numeric_string()).required())
        .attribute(AttributeSchema::new("desired_capacity", aws_types::numeric_string()))
        .attribute(
            AttributeSchema::new(
                "launch_template",
                AttributeType::Struct(vec![
                    AttributeSchema::new("launch_template_id", AttributeType::String).required(),
                    AttributeSchema::new("version", AttributeType::String).required(),
                ]),
            )
            .required(),
        )
        .attribute(AttributeSchema::new("vpc_zone_identifier", types::string_list()).required())
        .attribute(AttributeSchema::new("target_group_arns", types::string_list()))
        .attribute(AttributeSchema::new(
            "health_check_type",
            AttributeType::Enum(vec!["EC2".to_string(), "ELB".to_string()]),
        ))
        .attribute(AttributeSchema::new(
            "health_check_grace_period",
            types::non_negative_int(),
        ))
        .attribute(AttributeSchema::new("tags", types::tags()))
}

/// Returns the schema for Scaling Policy
pub fn scaling_policy_schema() -> ResourceSchema {
    let metric = AttributeType::Struct(vec![
        AttributeSchema::new(
            "predefined_metric_type",
            AttributeType::Enum(vec![
                "ASGAverageCPUUtilization".to_string(),
                "ALBRequestCountPerTarget".to_string(),
            ]),
        )
        .required(),
        AttributeSchema::new("resource_label", AttributeType::String),
    ]);

    ResourceSchema::new(rt::SCALING_POLICY)
        .with_description("A scaling trigger attached to an Auto Scaling Group")
        .attribute(AttributeSchema::new("auto_scaling_group_name", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "policy_type",
            AttributeType::Enum(vec!["TargetTrackingScaling".to_string()]),
        ))
        .attribute(
            AttributeSchema::new(
                "target_tracking_configuration",
                AttributeType::Struct(vec![
                    AttributeSchema::new("predefined_metric_specification", metric).required(),
                    AttributeSchema::new("target_value", types::positive_int()).required(),
                ]),
            )
            .required(),
        )
        .attribute(AttributeSchema::new(
            "estimated_instance_warmup",
            types::non_negative_int(),
        ))
}
