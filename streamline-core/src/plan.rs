//! Plan - Collection of resource changes between two templates

use crate::differ::Diff;

/// Plan containing the changes a deployment would make
#[derive(Debug, Clone, Default)]
pub struct Plan {
    changes: Vec<Diff>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, change: Diff) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Diff] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change {
                Diff::Create { .. } => summary.create += 1,
                Diff::Update { .. } => summary.update += 1,
                Diff::Delete { .. } => summary.delete += 1,
                Diff::NoChange(_) => {}
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} to update, {} to delete",
            self.create, self.update, self.delete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan() {
        let plan = Plan::new();
        assert!(plan.is_empty());
        assert_eq!(plan.summary(), PlanSummary::default());
    }

    #[test]
    fn plan_summary() {
        let mut plan = Plan::new();
        plan.add(Diff::Create {
            logical_id: "A".to_string(),
            type_name: "AWS::EC2::Subnet".to_string(),
        });
        plan.add(Diff::Create {
            logical_id: "B".to_string(),
            type_name: "AWS::EC2::Subnet".to_string(),
        });
        plan.add(Diff::Delete {
            logical_id: "C".to_string(),
            type_name: "AWS::EC2::Instance".to_string(),
        });

        let summary = plan.summary();
        assert_eq!(summary.create, 2);
        assert_eq!(summary.delete, 1);
        assert_eq!(
            summary.to_string(),
            "Plan: 2 to create, 0 to update, 1 to delete"
        );
    }
}
