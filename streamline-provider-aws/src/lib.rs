//! Streamline AWS Provider
//!
//! Declares the infrastructure hosting the Streamline dashboard (network,
//! access groups, role, load balancer, compute pool and boot script) and
//! renders it as a CloudFormation template.

pub mod access;
pub mod boot_script;
pub mod builder;
pub mod case_convert;
pub mod check;
pub mod compute;
pub mod config;
pub mod error;
pub mod identity;
pub mod load_balancer;
pub mod network;
pub mod resources;
pub mod schemas;

use serde_json::{Map, Value as JsonValue, json};
use streamline_core::provider::{
    Provider, ProviderError, ProviderResult, RenderedResource, ResourceType,
};
use streamline_core::template::value_to_json;
use streamline_core::{Resource, Value};

use case_convert::value_to_camel_case;
use resources::TagStyle;

pub use builder::{StreamlineStack, build_stack, synth_config};
pub use check::{Diagnostic, Severity};
pub use config::StackConfig;
pub use error::StackError;

/// Renders Streamline resource types as CloudFormation resources
pub struct AwsProvider;

impl AwsProvider {
    fn render_tags(&self, resource: &Resource, value: &Value, style: TagStyle) -> ProviderResult<JsonValue> {
        let Value::Map(tags) = value else {
            return Err(ProviderError::new("Expected tags to be a map").for_resource(resource.id.clone()));
        };
        let propagate = match style {
            TagStyle::None => {
                return Err(ProviderError::new(format!(
                    "Resource type '{}' does not support tags",
                    resource.id.resource_type
                ))
                .for_resource(resource.id.clone()));
            }
            TagStyle::KeyValue => false,
            TagStyle::Propagating => true,
        };

        let tags = tags
            .iter()
            .map(|(key, value)| {
                let mut tag = json!({ "Key": key, "Value": value_to_json(value) });
                if propagate {
                    tag["PropagateAtLaunch"] = JsonValue::Bool(true);
                }
                tag
            })
            .collect();
        Ok(JsonValue::Array(tags))
    }
}

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn render(&self, resource: &Resource) -> ProviderResult<RenderedResource> {
        let config = resources::config_for(&resource.id.resource_type).ok_or_else(|| {
            ProviderError::new(format!(
                "Unknown resource type: {}",
                resource.id.resource_type
            ))
            .for_resource(resource.id.clone())
        })?;

        let mut properties = Map::new();
        for (name, value) in &resource.attributes {
            if name == "tags" {
                properties.insert(
                    "Tags".to_string(),
                    self.render_tags(resource, value, config.tags)?,
                );
                continue;
            }
            let property = config.property_name(name).ok_or_else(|| {
                ProviderError::new(format!("Unknown attribute '{}'", name))
                    .for_resource(resource.id.clone())
            })?;
            properties.insert(
                property.to_string(),
                value_to_json(&value_to_camel_case(value)),
            );
        }

        Ok(RenderedResource {
            type_name: config.aws_type_name.to_string(),
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_maps_attribute_names() {
        let resource = Resource::new(resources::SUBNET, "PublicSubnet1")
            .with_attribute("vpc_id", Value::Ref("Vpc".to_string()))
            .with_attribute("cidr_block", "10.0.0.0/24")
            .with_attribute("availability_zone", Value::AvailabilityZone(1));

        let rendered = AwsProvider.render(&resource).unwrap();
        assert_eq!(rendered.type_name, "AWS::EC2::Subnet");
        assert_eq!(rendered.properties["VpcId"], json!({ "Ref": "Vpc" }));
        assert_eq!(rendered.properties["CidrBlock"], "10.0.0.0/24");
        assert_eq!(
            rendered.properties["AvailabilityZone"],
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
    }

    #[test]
    fn render_converts_nested_keys() {
        let resource = Resource::new(resources::TARGET_GROUP, "Tg")
            .with_attribute("matcher", Value::map([("http_code", Value::from("200"))]));
        let rendered = AwsProvider.render(&resource).unwrap();
        assert_eq!(rendered.properties["Matcher"], json!({ "HttpCode": "200" }));
    }

    #[test]
    fn render_tags_as_key_value_list() {
        let resource = Resource::new(resources::VPC, "Vpc").with_attribute(
            "tags",
            Value::map([("Name", Value::from("vpc")), ("team", Value::from("data"))]),
        );
        let rendered = AwsProvider.render(&resource).unwrap();
        assert_eq!(
            rendered.properties["Tags"],
            json!([{ "Key": "Name", "Value": "vpc" }, { "Key": "team", "Value": "data" }])
        );
    }

    #[test]
    fn auto_scaling_tags_propagate_at_launch() {
        let resource = Resource::new(resources::AUTO_SCALING_GROUP, "Asg")
            .with_attribute("tags", Value::map([("Name", Value::from("asg"))]));
        let rendered = AwsProvider.render(&resource).unwrap();
        assert_eq!(
            rendered.properties["Tags"],
            json!([{ "Key": "Name", "PropagateAtLaunch": true, "Value": "asg" }])
        );
    }

    #[test]
    fn render_rejects_unknown_attribute() {
        let resource =
            Resource::new(resources::VPC, "Vpc").with_attribute("color", "blue");
        let err = AwsProvider.render(&resource).unwrap_err();
        assert!(err.to_string().contains("Unknown attribute 'color'"));
    }

    #[test]
    fn render_rejects_tags_on_untagged_type() {
        let resource = Resource::new(resources::ROUTE, "Route")
            .with_attribute("tags", Value::map([("Name", Value::from("r"))]));
        assert!(AwsProvider.render(&resource).is_err());
    }

    #[test]
    fn schema_lookup_through_provider() {
        assert!(AwsProvider.schema_for(resources::LISTENER).is_some());
        assert!(AwsProvider.schema_for("s3.bucket").is_none());
    }
}
