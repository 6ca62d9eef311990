//! Differ - Compare a freshly synthesised template with a previous one
//!
//! Compares the "desired" template with the "current" template (typically the
//! one last deployed) and generates the list of resource changes (Plan).

use std::collections::BTreeSet;

use crate::plan::Plan;
use crate::template::{Template, TemplateResource};

/// Result of comparing one logical ID across two templates
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource is new -> will be created
    Create { logical_id: String, type_name: String },
    /// Resource exists with differences -> will be updated
    Update {
        logical_id: String,
        type_name: String,
        changed_properties: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(String),
    /// Resource is gone from the desired template -> will be deleted
    Delete { logical_id: String, type_name: String },
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }

    pub fn logical_id(&self) -> &str {
        match self {
            Diff::Create { logical_id, .. }
            | Diff::Update { logical_id, .. }
            | Diff::Delete { logical_id, .. } => logical_id,
            Diff::NoChange(logical_id) => logical_id,
        }
    }
}

impl std::fmt::Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diff::Create {
                logical_id,
                type_name,
            } => write!(f, "+ {} {}", type_name, logical_id),
            Diff::Update {
                logical_id,
                type_name,
                changed_properties,
            } => write!(
                f,
                "~ {} {} ({})",
                type_name,
                logical_id,
                changed_properties.join(", ")
            ),
            Diff::NoChange(logical_id) => write!(f, "  {}", logical_id),
            Diff::Delete {
                logical_id,
                type_name,
            } => write!(f, "- {} {}", type_name, logical_id),
        }
    }
}

/// Compare the desired and current versions of one resource
pub fn diff(
    logical_id: &str,
    desired: Option<&TemplateResource>,
    current: Option<&TemplateResource>,
) -> Option<Diff> {
    match (desired, current) {
        (Some(d), None) => Some(Diff::Create {
            logical_id: logical_id.to_string(),
            type_name: d.type_name.clone(),
        }),
        (None, Some(c)) => Some(Diff::Delete {
            logical_id: logical_id.to_string(),
            type_name: c.type_name.clone(),
        }),
        (Some(d), Some(c)) => {
            let changed = find_changed_properties(d, c);
            if changed.is_empty() {
                Some(Diff::NoChange(logical_id.to_string()))
            } else {
                Some(Diff::Update {
                    logical_id: logical_id.to_string(),
                    type_name: d.type_name.clone(),
                    changed_properties: changed,
                })
            }
        }
        (None, None) => None,
    }
}

/// Find changed properties between desired and current resource
fn find_changed_properties(desired: &TemplateResource, current: &TemplateResource) -> Vec<String> {
    let mut changed = Vec::new();

    if desired.type_name != current.type_name {
        changed.push("Type".to_string());
    }

    let keys: BTreeSet<&String> = desired
        .properties
        .keys()
        .chain(current.properties.keys())
        .collect();
    for key in keys {
        if desired.properties.get(key) != current.properties.get(key) {
            changed.push(key.clone());
        }
    }

    if desired.depends_on != current.depends_on {
        changed.push("DependsOn".to_string());
    }

    changed
}

/// Compare every resource of two templates, ordered by logical ID
pub fn diff_templates(desired: &Template, current: &Template) -> Vec<Diff> {
    let ids: BTreeSet<&String> = desired
        .resources
        .keys()
        .chain(current.resources.keys())
        .collect();

    ids.into_iter()
        .filter_map(|id| diff(id, desired.resources.get(id), current.resources.get(id)))
        .collect()
}

/// Compute Diffs for two templates and keep the changes as a Plan
pub fn create_plan(desired: &Template, current: &Template) -> Plan {
    let mut plan = Plan::new();
    for d in diff_templates(desired, current) {
        if d.is_change() {
            plan.add(d);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use std::collections::BTreeMap;

    fn resource(type_name: &str, props: serde_json::Value) -> TemplateResource {
        let properties: Map<String, serde_json::Value> = match props {
            serde_json::Value::Object(map) => map,
            _ => Map::new(),
        };
        TemplateResource {
            type_name: type_name.to_string(),
            properties,
            depends_on: vec![],
        }
    }

    fn template(resources: Vec<(&str, TemplateResource)>) -> Template {
        Template {
            format_version: "2010-09-09".to_string(),
            description: None,
            parameters: BTreeMap::new(),
            resources: resources
                .into_iter()
                .map(|(id, r)| (id.to_string(), r))
                .collect(),
            outputs: BTreeMap::new(),
        }
    }

    #[test]
    fn diff_create_when_new() {
        let r = resource("AWS::EC2::VPC", json!({}));
        assert!(matches!(diff("Vpc", Some(&r), None), Some(Diff::Create { .. })));
    }

    #[test]
    fn diff_no_change_when_same() {
        let r = resource("AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" }));
        assert_eq!(
            diff("Vpc", Some(&r), Some(&r.clone())),
            Some(Diff::NoChange("Vpc".to_string()))
        );
    }

    #[test]
    fn diff_update_lists_changed_properties() {
        let desired = resource(
            "AWS::AutoScaling::AutoScalingGroup",
            json!({ "MaxSize": "4", "MinSize": "2" }),
        );
        let current = resource(
            "AWS::AutoScaling::AutoScalingGroup",
            json!({ "MaxSize": "2", "MinSize": "2", "Cooldown": "300" }),
        );

        match diff("Asg", Some(&desired), Some(&current)) {
            Some(Diff::Update {
                changed_properties, ..
            }) => assert_eq!(changed_properties, vec!["Cooldown", "MaxSize"]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn create_plan_from_templates() {
        let desired = template(vec![
            ("Vpc", resource("AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" }))),
            ("Alb", resource("AWS::ElasticLoadBalancingV2::LoadBalancer", json!({}))),
        ]);
        let current = template(vec![
            ("Vpc", resource("AWS::EC2::VPC", json!({ "CidrBlock": "10.1.0.0/16" }))),
            ("Instance", resource("AWS::EC2::Instance", json!({}))),
        ]);

        let plan = create_plan(&desired, &current);
        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.update, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(plan.changes()[0].logical_id(), "Alb");
        assert_eq!(plan.changes()[0].to_string(), "+ AWS::ElasticLoadBalancingV2::LoadBalancer Alb");
    }
}
