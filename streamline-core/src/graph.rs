//! Dependency graph between declared resources
//!
//! Edges come from references inside attribute values and from explicit
//! `depends_on` entries. The graph yields a deterministic creation order.

use std::collections::{BTreeMap, BTreeSet};

use crate::resource::Resource;

/// Dependency graph for resources within a stack
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Every resource in the graph, including ones without edges
    nodes: BTreeSet<String>,
    /// Logical ID -> logical IDs it depends on
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Reverse edges: target -> resources that depend on it
    reverse_edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of resources
    ///
    /// References to names that are not resources (template parameters,
    /// pseudo parameters) are not edges and are skipped here.
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut graph = Self::new();
        for resource in resources {
            graph.add_node(resource.logical_id());
        }
        for resource in resources {
            for dep in resource.dependencies() {
                if graph.nodes.contains(dep) {
                    graph.add_edge(resource.logical_id(), dep);
                }
            }
        }
        graph
    }

    pub fn add_node(&mut self, name: &str) {
        self.nodes.insert(name.to_string());
    }

    /// Add a dependency edge
    pub fn add_edge(&mut self, from: &str, target: &str) {
        self.add_node(from);
        self.add_node(target);
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(target.to_string());
        self.reverse_edges
            .entry(target.to_string())
            .or_default()
            .insert(from.to_string());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resources that depend on nothing
    pub fn root_resources(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| self.edges.get(*n).is_none_or(|deps| deps.is_empty()))
            .map(String::as_str)
            .collect()
    }

    /// Resources that nothing depends on
    pub fn leaf_resources(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| !self.reverse_edges.contains_key(*n))
            .map(String::as_str)
            .collect()
    }

    /// Get direct dependencies of a resource
    pub fn dependencies_of(&self, resource: &str) -> Vec<&str> {
        self.edges
            .get(resource)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Get resources that depend on this resource
    pub fn dependents_of(&self, resource: &str) -> Vec<&str> {
        self.reverse_edges
            .get(resource)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Order resources so that every dependency precedes its dependents
    ///
    /// Ties are broken alphabetically. On a cycle, returns the resources
    /// that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), self.edges.get(n).map_or(0, |d| d.len())))
            .collect();

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(n, _)| *n)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop_first() {
            remaining.remove(next);
            order.push(next.to_string());
            for dependent in self.dependents_of(next) {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if remaining.is_empty() {
            Ok(order)
        } else {
            Err(remaining.keys().map(|n| n.to_string()).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Value;

    fn network() -> Vec<Resource> {
        vec![
            Resource::new("ec2.subnet", "SubnetA").with_attribute("vpc_id", Value::Ref("Vpc".into())),
            Resource::new("ec2.vpc", "Vpc"),
            Resource::new("ec2.security_group", "Sg")
                .with_attribute("vpc_id", Value::Ref("Vpc".into()))
                .with_attribute("description", Value::Ref("AWS::StackName".into())),
            Resource::new("elbv2.load_balancer", "Alb")
                .with_attribute("subnets", Value::List(vec![Value::Ref("SubnetA".into())]))
                .with_attribute(
                    "security_groups",
                    Value::List(vec![Value::attr("Sg", "GroupId")]),
                ),
        ]
    }

    #[test]
    fn from_resources_ignores_parameters() {
        let graph = DependencyGraph::from_resources(&network());
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependencies_of("Sg"), vec!["Vpc"]);
        assert_eq!(graph.dependents_of("Vpc"), vec!["Sg", "SubnetA"]);
    }

    #[test]
    fn roots_and_leaves() {
        let graph = DependencyGraph::from_resources(&network());
        assert_eq!(graph.root_resources(), vec!["Vpc"]);
        assert_eq!(graph.leaf_resources(), vec!["Alb"]);
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let graph = DependencyGraph::from_resources(&network());
        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec!["Vpc", "Sg", "SubnetA", "Alb"]);
    }

    #[test]
    fn topological_order_reports_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_node("Standalone");
        graph.add_edge("A", "B");
        graph.add_edge("B", "A");

        let cycle = graph.topological_order().unwrap_err();
        assert_eq!(cycle, vec!["A", "B"]);
    }
}
