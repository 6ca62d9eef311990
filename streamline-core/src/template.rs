//! Template - Synthesis of a Stack into a deployable CloudFormation template
//!
//! Synthesis is a pure function of the declaration: the same Stack and
//! Provider always produce a byte-identical document. Any declaration error
//! aborts synthesis and no template is produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

use crate::graph::DependencyGraph;
use crate::provider::{Provider, ProviderError};
use crate::resource::{ResourceId, Value};
use crate::stack::{Parameter, Stack};

/// Template format version emitted in every template
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Errors that abort synthesis
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("Logical ID '{0}' is declared more than once")]
    DuplicateLogicalId(String),

    #[error("{from} references '{target}', which is not declared in the stack")]
    DanglingReference { from: String, target: String },

    #[error("Dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Resource type '{}' of '{}' is not supported by provider '{provider}'", .id.resource_type, .id.name)]
    UnsupportedResourceType { id: ResourceId, provider: String },

    #[error("Invalid resources:\n{}", .0.join("\n"))]
    InvalidResources(Vec<String>),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A resource entry of the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, JsonValue>,
    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// An output entry of the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: JsonValue,
}

/// Synthesised template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    /// Pretty-printed JSON with a trailing newline
    pub fn to_json_string(&self) -> Result<String, SynthError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SynthError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Number of resources with the given provider type name
    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.resources
            .values()
            .filter(|r| r.type_name == type_name)
            .count()
    }

    /// Resources with the given provider type name, keyed by logical ID
    pub fn resources_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.type_name == type_name)
    }
}

/// Convert an attribute value into its template JSON form
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Int(n) => json!(n),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Ref(name) => json!({ "Ref": name }),
        Value::ResourceAttr(name, attr) => json!({ "Fn::GetAtt": [name, attr] }),
        Value::Base64(inner) => json!({ "Fn::Base64": value_to_json(inner) }),
        Value::Join(sep, parts) => {
            let parts: Vec<JsonValue> = parts.iter().map(value_to_json).collect();
            json!({ "Fn::Join": [sep, parts] })
        }
        Value::AvailabilityZone(index) => {
            json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
        }
    }
}

fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with("AWS::")
}

/// Check that every reference in the stack resolves to a declared name
pub fn check_references(stack: &Stack) -> Result<(), SynthError> {
    let resolves = |target: &str| stack.contains(target) || is_pseudo_parameter(target);

    for resource in stack.resources() {
        if let Some(target) = resource.dependencies().into_iter().find(|&t| !resolves(t)) {
            return Err(SynthError::DanglingReference {
                from: resource.id.to_string(),
                target: target.to_string(),
            });
        }
    }
    for (name, output) in stack.outputs() {
        if let Some(target) = output.value.references().into_iter().find(|&t| !resolves(t)) {
            return Err(SynthError::DanglingReference {
                from: format!("output.{}", name),
                target: target.to_string(),
            });
        }
    }
    Ok(())
}

/// Synthesise a Stack into a Template using a Provider
pub fn synth<P: Provider + ?Sized>(stack: &Stack, provider: &P) -> Result<Template, SynthError> {
    check_references(stack)?;

    let order = DependencyGraph::from_resources(stack.resources())
        .topological_order()
        .map_err(SynthError::DependencyCycle)?;

    let mut errors = Vec::new();
    let mut resources = BTreeMap::new();

    for logical_id in &order {
        let Some(resource) = stack.resource(logical_id) else {
            continue;
        };

        let schema = provider
            .schema_for(&resource.id.resource_type)
            .ok_or_else(|| SynthError::UnsupportedResourceType {
                id: resource.id.clone(),
                provider: provider.name().to_string(),
            })?;

        if let Err(type_errors) = schema.validate(&resource.attributes) {
            for error in type_errors {
                errors.push(format!("{}: {}", resource.id, error));
            }
            continue;
        }

        let rendered = provider
            .render(resource)
            .map_err(|e| e.for_resource(resource.id.clone()))?;
        log::debug!("rendered {} as {}", resource.id, rendered.type_name);

        let mut depends_on = resource.depends_on.clone();
        depends_on.sort();
        depends_on.dedup();

        resources.insert(
            logical_id.clone(),
            TemplateResource {
                type_name: rendered.type_name,
                properties: rendered.properties,
                depends_on,
            },
        );
    }

    if !errors.is_empty() {
        return Err(SynthError::InvalidResources(errors));
    }

    let outputs = stack
        .outputs()
        .iter()
        .map(|(name, output)| {
            (
                name.clone(),
                TemplateOutput {
                    description: output.description.clone(),
                    value: value_to_json(&output.value),
                },
            )
        })
        .collect();

    log::info!(
        "synthesised stack '{}' with {} resources",
        stack.name,
        resources.len()
    );

    Ok(Template {
        format_version: FORMAT_VERSION.to_string(),
        description: stack.description.clone(),
        parameters: stack.parameters().clone(),
        resources,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::MockProvider;
    use crate::resource::Resource;

    fn bucket(name: &str) -> Resource {
        Resource::new("mock.bucket", name).with_attribute("bucket_name", name.to_lowercase())
    }

    #[test]
    fn value_to_json_renders_intrinsics() {
        assert_eq!(value_to_json(&Value::Ref("Vpc".into())), json!({ "Ref": "Vpc" }));
        assert_eq!(
            value_to_json(&Value::attr("Alb", "DNSName")),
            json!({ "Fn::GetAtt": ["Alb", "DNSName"] })
        );
        assert_eq!(
            value_to_json(&Value::Base64(Box::new(Value::from("#!/bin/bash")))),
            json!({ "Fn::Base64": "#!/bin/bash" })
        );
        assert_eq!(
            value_to_json(&Value::AvailabilityZone(1)),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
        assert_eq!(
            value_to_json(&Value::Join(
                "".into(),
                vec![Value::from("arn:"), Value::Ref("AWS::Partition".into())]
            )),
            json!({ "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }]] })
        );
    }

    #[test]
    fn synth_renders_resources_and_outputs() {
        let mut stack = Stack::new("demo").with_description("demo stack");
        stack.add(bucket("Logs")).unwrap();
        stack
            .add(bucket("Data").with_attribute("source", Value::Ref("Logs".into())))
            .unwrap();
        stack.add_output("DataName", Value::Ref("Data".into()), None);

        let template = synth(&stack, &MockProvider).unwrap();
        assert_eq!(template.format_version, FORMAT_VERSION);
        assert_eq!(template.resources.len(), 2);
        assert_eq!(template.count_of_type("Mock::Bucket"), 2);
        assert_eq!(
            template.resources["Data"].properties["source"],
            json!({ "Ref": "Logs" })
        );
        assert_eq!(template.outputs["DataName"].value, json!({ "Ref": "Data" }));
    }

    #[test]
    fn synth_is_deterministic() {
        let mut stack = Stack::new("demo");
        stack.add(bucket("Zeta")).unwrap();
        stack.add(bucket("Alpha")).unwrap();

        let first = synth(&stack, &MockProvider).unwrap().to_json_string().unwrap();
        let second = synth(&stack, &MockProvider).unwrap().to_json_string().unwrap();
        assert_eq!(first, second);
        assert!(first.find("\"Alpha\"").unwrap() < first.find("\"Zeta\"").unwrap());
    }

    #[test]
    fn dangling_reference_fails() {
        let mut stack = Stack::new("demo");
        stack
            .add(bucket("Data").with_attribute("source", Value::Ref("Missing".into())))
            .unwrap();

        let err = synth(&stack, &MockProvider).unwrap_err();
        assert!(matches!(err, SynthError::DanglingReference { target, .. } if target == "Missing"));
    }

    #[test]
    fn pseudo_parameters_resolve() {
        let mut stack = Stack::new("demo");
        stack
            .add(bucket("Data").with_attribute("source", Value::Ref("AWS::StackName".into())))
            .unwrap();
        assert!(synth(&stack, &MockProvider).is_ok());
    }

    #[test]
    fn cycle_fails() {
        let mut stack = Stack::new("demo");
        stack.add(bucket("A").with_dependency("B")).unwrap();
        stack.add(bucket("B").with_dependency("A")).unwrap();

        let err = synth(&stack, &MockProvider).unwrap_err();
        assert!(matches!(err, SynthError::DependencyCycle(ids) if ids == vec!["A", "B"]));
    }

    #[test]
    fn schema_errors_are_collected() {
        let mut stack = Stack::new("demo");
        stack.add(Resource::new("mock.bucket", "A")).unwrap();
        stack
            .add(Resource::new("mock.bucket", "B").with_attribute("bucket_name", 3i64))
            .unwrap();

        match synth(&stack, &MockProvider).unwrap_err() {
            SynthError::InvalidResources(errors) => assert_eq!(errors.len(), 2),
            other => panic!("Expected InvalidResources, got {other}"),
        }
    }

    #[test]
    fn unsupported_type_fails() {
        let mut stack = Stack::new("demo");
        stack.add(Resource::new("mock.queue", "Q")).unwrap();
        assert!(matches!(
            synth(&stack, &MockProvider),
            Err(SynthError::UnsupportedResourceType { .. })
        ));
    }

    #[test]
    fn template_round_trips_through_json() {
        let mut stack = Stack::new("demo");
        stack.add(bucket("Data")).unwrap();
        let template = synth(&stack, &MockProvider).unwrap();
        let parsed = Template::from_json_str(&template.to_json_string().unwrap()).unwrap();
        assert_eq!(parsed, template);
    }
}
