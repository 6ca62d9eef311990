//! Case conversion utilities for attribute names to CloudFormation property names
//!
//! Streamline declares attributes in snake_case (e.g., `vpc_id`, `launch_template_data`)
//! CloudFormation uses PascalCase (e.g., `VpcId`, `LaunchTemplateData`)

use heck::ToUpperCamelCase;

use streamline_core::resource::Value;

/// Property names whose acronyms do not survive plain PascalCase conversion
const PROPERTY_OVERRIDES: &[(&str, &str)] = &[
    ("target_group_arns", "TargetGroupARNs"),
    ("vpc_zone_identifier", "VPCZoneIdentifier"),
];

/// Convert snake_case to PascalCase
/// e.g., "cidr_block" -> "CidrBlock"
pub fn to_camel_case(s: &str) -> String {
    PROPERTY_OVERRIDES
        .iter()
        .find(|(snake, _)| *snake == s)
        .map(|(_, camel)| camel.to_string())
        .unwrap_or_else(|| s.to_upper_camel_case())
}

/// Recursively convert map keys of a value to PascalCase
///
/// Only keys change; string contents such as `internet-facing` are kept.
pub fn value_to_camel_case(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (to_camel_case(k), value_to_camel_case(v)))
                .collect(),
        ),
        Value::List(items) => Value::List(items.iter().map(value_to_camel_case).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("cidr_block"), "CidrBlock");
        assert_eq!(to_camel_case("map_public_ip_on_launch"), "MapPublicIpOnLaunch");
        assert_eq!(to_camel_case("source_security_group_id"), "SourceSecurityGroupId");
        assert_eq!(to_camel_case("ebs"), "Ebs");
    }

    #[test]
    fn test_overrides() {
        assert_eq!(to_camel_case("target_group_arns"), "TargetGroupARNs");
        assert_eq!(to_camel_case("vpc_zone_identifier"), "VPCZoneIdentifier");
    }

    #[test]
    fn test_value_to_camel_case_nested() {
        let value = Value::map([(
            "launch_template_data",
            Value::map([
                ("instance_type", Value::from("t2.micro")),
                (
                    "security_group_ids",
                    Value::List(vec![Value::attr("InstanceSg", "GroupId")]),
                ),
            ]),
        )]);

        let converted = value_to_camel_case(&value);
        let Value::Map(outer) = converted else {
            panic!("Expected map");
        };
        let Value::Map(inner) = &outer["LaunchTemplateData"] else {
            panic!("Expected nested map");
        };
        assert_eq!(inner["InstanceType"], Value::from("t2.micro"));
        assert!(inner.contains_key("SecurityGroupIds"));
    }
}
