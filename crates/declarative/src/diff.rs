//! Diff computation for resources

use crate::resource::{Resource, ResourceExt};
use crate::types::{Action, PlannedChange, ResourceState};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A planned change for one resource, with the states it was derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
    /// What will be done
    pub change: PlannedChange,
}

impl ResourceDiff {
    /// Plan a resource, returning None if no changes are needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let change = resource.plan()?;
        if !change.is_change() {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current: resource.current_state()?,
            desired: resource.desired_state(),
            change,
        }))
    }

    /// The planned action
    pub fn action(&self) -> Action {
        self.change.action
    }

    /// `type.id`
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.resource_id)
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that need a change. A resource that cannot be
/// planned fails the whole computation.
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for resource in resources {
        let diff = ResourceDiff::from_resource(resource.as_ref())
            .with_context(|| format!("Failed to plan {}", resource.address()))?;
        diffs.extend(diff);
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action() {
                Action::Create => summary.creates += 1,
                Action::Update => summary.updates += 1,
                Action::Replace => summary.replaces += 1,
                Action::Delete => summary.deletes += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }

    /// Whether any change destroys a remote resource
    pub fn is_destructive(&self) -> bool {
        self.replaces + self.deletes > 0
    }
}

/// Group diffs by resource type, in type order
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
