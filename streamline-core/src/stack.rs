//! Stack - A named, independently deployable set of declared resources

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::{Resource, Value};
use crate::template::SynthError;

/// Template parameter resolved by the deployment service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    /// Parameter type (e.g., "String", "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>")
    #[serde(rename = "Type")]
    pub parameter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(parameter_type: impl Into<String>) -> Self {
        Self {
            parameter_type: parameter_type.into(),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Value exported by the stack after deployment
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub value: Value,
    pub description: Option<String>,
}

/// In-memory declaration of a stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub name: String,
    pub description: Option<String>,
    resources: Vec<Resource>,
    parameters: BTreeMap<String, Parameter>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a resource. Logical IDs must be unique within the stack.
    pub fn add(&mut self, resource: Resource) -> Result<(), SynthError> {
        if self.contains(resource.logical_id()) {
            return Err(SynthError::DuplicateLogicalId(resource.logical_id().to_string()));
        }
        log::debug!("declared {}", resource.id);
        self.resources.push(resource);
        Ok(())
    }

    /// Declare several resources in order
    pub fn add_all(&mut self, resources: impl IntoIterator<Item = Resource>) -> Result<(), SynthError> {
        for resource in resources {
            self.add(resource)?;
        }
        Ok(())
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, parameter: Parameter) -> Result<(), SynthError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(SynthError::DuplicateLogicalId(name));
        }
        self.parameters.insert(name, parameter);
        Ok(())
    }

    pub fn add_output(&mut self, name: impl Into<String>, value: Value, description: Option<String>) {
        self.outputs.insert(name.into(), Output { value, description });
    }

    /// True if a resource or parameter uses this logical ID
    pub fn contains(&self, logical_id: &str) -> bool {
        self.parameters.contains_key(logical_id) || self.resource(logical_id).is_some()
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id() == logical_id)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Resources of one type in declaration order
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Resource> {
        self.resources
            .iter()
            .filter(move |r| r.id.resource_type == resource_type)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }
}
