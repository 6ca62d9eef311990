//! Resource - Representing declared resources and their attribute values

use std::collections::BTreeMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "ec2.vpc", "elbv2.listener")
    pub resource_type: String,
    /// Logical ID of the resource within the template (e.g., "StreamlineVpc")
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Reference to another resource, a template parameter, or a pseudo parameter
    Ref(String),
    /// Attribute of another resource (logical_id, attribute_name)
    ResourceAttr(String, String),
    /// Base64-encode the inner value at deploy time
    Base64(Box<Value>),
    /// Join the parts with a separator at deploy time
    Join(String, Vec<Value>),
    /// Nth availability zone of the region the stack is deployed to
    AvailabilityZone(usize),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Build a map value from (key, value) pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn attr(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::ResourceAttr(logical_id.into(), attribute.into())
    }

    /// Logical IDs referenced anywhere inside this value
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Value::Ref(name) | Value::ResourceAttr(name, _) => refs.push(name.as_str()),
            Value::List(items) | Value::Join(_, items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.collect_references(refs);
                }
            }
            Value::Base64(inner) => inner.collect_references(refs),
            Value::String(_) | Value::Int(_) | Value::Bool(_) | Value::AvailabilityZone(_) => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Desired state of a single resource as declared by a stack
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: BTreeMap<String, Value>,
    /// Explicit ordering edges not implied by references
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// Logical ID of this resource
    pub fn logical_id(&self) -> &str {
        &self.id.name
    }

    /// Reference to this resource (`Ref`)
    pub fn reference(&self) -> Value {
        Value::Ref(self.id.name.clone())
    }

    /// Reference to one of this resource's attributes (`Fn::GetAtt`)
    pub fn attr(&self, attribute: impl Into<String>) -> Value {
        Value::ResourceAttr(self.id.name.clone(), attribute.into())
    }

    /// Logical IDs this resource depends on, through references or explicitly
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .attributes
            .values()
            .flat_map(|v| v.references())
            .chain(self.depends_on.iter().map(String::as_str))
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_collects_nested_references() {
        let resource = Resource::new("ec2.subnet", "PublicSubnet1")
            .with_attribute("vpc_id", Value::Ref("Vpc".to_string()))
            .with_attribute(
                "tags",
                Value::map([("Name", Value::Join("-".into(), vec![Value::Ref("AWS::StackName".into())]))]),
            )
            .with_dependency("GatewayAttachment");

        assert_eq!(
            resource.dependencies(),
            vec!["AWS::StackName", "GatewayAttachment", "Vpc"]
        );
    }

    #[test]
    fn dependencies_are_deduplicated() {
        let resource = Resource::new("ec2.route", "Route")
            .with_attribute("route_table_id", Value::Ref("Table".to_string()))
            .with_attribute("other", Value::attr("Table", "Id"));

        assert_eq!(resource.dependencies(), vec!["Table"]);
    }

    #[test]
    fn resource_id_display() {
        let id = ResourceId::new("ec2.vpc", "StreamlineVpc");
        assert_eq!(id.to_string(), "ec2.vpc.StreamlineVpc");
    }
}
