//! Identity - The role every instance of a pool assumes

use streamline_core::{Resource, Value};

use crate::resources as rt;

/// Service principal trusted by compute roles
pub const EC2_PRINCIPAL: &str = "ec2.amazonaws.com";

/// Grants Systems Manager session access instead of SSH keys
pub const SSM_MANAGED_INSTANCE_CORE: &str = "AmazonSSMManagedInstanceCore";

#[derive(Debug, Clone)]
pub struct ComputeRole {
    pub logical_id: String,
    managed_policies: Vec<String>,
}

impl ComputeRole {
    pub fn new(logical_id: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            managed_policies: Vec::new(),
        }
    }

    /// Attach an AWS managed policy by name
    pub fn add_managed_policy(&mut self, name: impl Into<String>) -> &mut Self {
        self.managed_policies.push(name.into());
        self
    }

    pub fn managed_policies(&self) -> &[String] {
        &self.managed_policies
    }

    pub fn instance_profile_id(&self) -> String {
        format!("{}InstanceProfile", self.logical_id)
    }

    /// ARN of the instance profile passing this role to instances
    pub fn instance_profile_arn(&self) -> Value {
        Value::attr(self.instance_profile_id(), "Arn")
    }

    pub fn resources(&self) -> Vec<Resource> {
        let trust = Value::map([
            ("version", Value::from("2012-10-17")),
            (
                "statement",
                Value::List(vec![Value::map([
                    ("effect", Value::from("Allow")),
                    ("principal", Value::map([("service", Value::from(EC2_PRINCIPAL))])),
                    ("action", Value::from("sts:AssumeRole")),
                ])]),
            ),
        ]);

        let mut role = Resource::new(rt::ROLE, &self.logical_id)
            .with_attribute("assume_role_policy_document", trust)
            .with_attribute("description", "Role assumed by application instances");
        if !self.managed_policies.is_empty() {
            role = role.with_attribute(
                "managed_policy_arns",
                Value::List(self.managed_policies.iter().map(|p| managed_policy_arn(p)).collect()),
            );
        }

        let profile = Resource::new(rt::INSTANCE_PROFILE, self.instance_profile_id())
            .with_attribute("roles", Value::List(vec![Value::Ref(self.logical_id.clone())]));

        vec![role, profile]
    }
}

/// `arn:<partition>:iam::aws:policy/<name>`
fn managed_policy_arn(name: &str) -> Value {
    Value::Join(
        String::new(),
        vec![
            Value::from("arn:"),
            Value::Ref("AWS::Partition".to_string()),
            Value::from(format!(":iam::aws:policy/{}", name)),
        ],
    )
}
