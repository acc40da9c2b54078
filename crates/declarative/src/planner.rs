//! Execution planner - builds resource execution plans

use crate::resource::{BoxedResource, Resource};

/// An execution plan with resources grouped by whether they may run
/// concurrently
pub struct ExecutionPlan {
    /// Resources applied on the thread pool
    pub parallel: Vec<BoxedResource>,
    /// Resources applied one at a time after the parallel batch
    pub sequential: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            parallel: Vec::new(),
            sequential: Vec::new(),
        }
    }

    /// Add a resource, placing it by [`Resource::can_parallelize`]
    pub fn add_resource(&mut self, resource: BoxedResource) {
        if resource.can_parallelize() {
            self.parallel.push(resource);
        } else {
            self.sequential.push(resource);
        }
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            parallel: self
                .parallel
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
            sequential: self
                .sequential
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type, name))
            }
        }
    }

    /// All resources, parallel batch first
    pub fn resources(&self) -> impl Iterator<Item = &BoxedResource> {
        self.parallel.iter().chain(self.sequential.iter())
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.parallel.len() + self.sequential.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.parallel.is_empty() && self.sequential.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<BoxedResource> for ExecutionPlan {
    fn from_iter<I: IntoIterator<Item = BoxedResource>>(iter: I) -> Self {
        let mut plan = Self::new();
        for resource in iter {
            plan.add_resource(resource);
        }
        plan
    }
}

/// Parse a target string like "type.name" into (type, name)
///
/// Only the first dot separates, so names may contain dots.
fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('.') {
        Some((resource_type, name)) => (resource_type, Some(name)),
        None => (target, None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: &str, name: Option<&str>) -> bool {
    let rt = resource.resource_type();
    // "dashboards" selects "dashboard"
    if rt != resource_type && rt != resource_type.trim_end_matches('s') {
        return false;
    }
    name.is_none_or(|n| resource.id() == n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::{ApplyResult, PlannedChange, ResourceState};
    use anyhow::Result;

    #[derive(Debug)]
    struct Named {
        kind: &'static str,
        id: &'static str,
        parallel: bool,
    }

    impl Resource for Named {
        fn id(&self) -> String {
            self.id.to_string()
        }
        fn description(&self) -> String {
            self.id.to_string()
        }
        fn resource_type(&self) -> &'static str {
            self.kind
        }
        fn current_state(&self) -> Result<ResourceState> {
            Ok(ResourceState::Absent)
        }
        fn desired_state(&self) -> ResourceState {
            ResourceState::Absent
        }
        fn apply(&self, _ctx: &ApplyContext, _change: &PlannedChange) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
        fn can_parallelize(&self) -> bool {
            self.parallel
        }
    }

    fn plan() -> ExecutionPlan {
        [
            Named {
                kind: "dashboard",
                id: "sales",
                parallel: true,
            },
            Named {
                kind: "dashboard",
                id: "sales.eu",
                parallel: true,
            },
            Named {
                kind: "folder",
                id: "shared",
                parallel: false,
            },
        ]
        .into_iter()
        .map(|r| Box::new(r) as BoxedResource)
        .collect()
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("dashboard"), ("dashboard", None));
        assert_eq!(parse_target("dashboard.sales"), ("dashboard", Some("sales")));
        assert_eq!(
            parse_target("dashboard.sales.eu"),
            ("dashboard", Some("sales.eu"))
        );
    }

    #[test]
    fn test_add_resource_splits_by_parallelism() {
        let plan = plan();
        assert_eq!(plan.parallel.len(), 2);
        assert_eq!(plan.sequential.len(), 1);
        assert_eq!(plan.total_resources(), 3);
    }

    #[test]
    fn test_filter_by_type() {
        let filtered = plan().filter_by_target(Some("dashboards"));
        assert_eq!(filtered.total_resources(), 2);
    }

    #[test]
    fn test_filter_by_exact_name() {
        let filtered = plan().filter_by_target(Some("dashboard.sales"));
        let ids: Vec<String> = filtered.resources().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["sales".to_string()]);
    }

    #[test]
    fn test_filter_none_keeps_everything() {
        assert_eq!(plan().filter_by_target(None).total_resources(), 3);
    }
}
