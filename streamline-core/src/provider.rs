//! Provider - Trait abstracting how resources are rendered
//!
//! A Provider knows the resource types of one cloud (AWS, ...) and is
//! responsible for turning a declared Resource into a template entry.

use serde_json::{Map, Value as JsonValue};

use crate::resource::{Resource, ResourceId};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "ec2.vpc")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
    }
}

/// A resource as it appears in the rendered template
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResource {
    /// Provider type name (e.g., "AWS::EC2::VPC")
    pub type_name: String,
    pub properties: Map<String, JsonValue>,
}

/// Main Provider trait
///
/// Each infrastructure provider implements this trait.
/// Rendering is pure: no provider API is ever called.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Schema for a resource type, if this Provider knows it
    fn schema_for(&self, resource_type: &str) -> Option<ResourceSchema> {
        self.resource_types()
            .into_iter()
            .find(|t| t.name() == resource_type)
            .map(|t| t.schema())
    }

    /// Render a resource into its template form
    fn render(&self, resource: &Resource) -> ProviderResult<RenderedResource>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn schema_for(&self, resource_type: &str) -> Option<ResourceSchema> {
        (**self).schema_for(resource_type)
    }

    fn render(&self, resource: &Resource) -> ProviderResult<RenderedResource> {
        (**self).render(resource)
    }
}
