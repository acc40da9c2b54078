//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{Action, ApplyResult, PlannedChange, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (id, description, type)
/// - State detection (current vs desired)
/// - Planning (which [`Action`] converges it)
/// - State convergence (apply)
///
/// # Example
///
/// ```
/// use declarative::{Action, ApplyContext, ApplyResult, PlannedChange, Resource, ResourceState};
///
/// #[derive(Debug)]
/// struct Marker {
///     name: String,
///     exists: bool,
/// }
///
/// impl Resource for Marker {
///     fn id(&self) -> String {
///         self.name.clone()
///     }
///
///     fn description(&self) -> String {
///         format!("Marker {}", self.name)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "marker"
///     }
///
///     fn current_state(&self) -> anyhow::Result<ResourceState> {
///         Ok(if self.exists {
///             ResourceState::Present { details: None }
///         } else {
///             ResourceState::Absent
///         })
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present { details: None }
///     }
///
///     fn apply(&self, _ctx: &ApplyContext, change: &PlannedChange) -> anyhow::Result<ApplyResult> {
///         match change.action {
///             Action::Create => Ok(ApplyResult::Created),
///             _ => Ok(ApplyResult::NoChange),
///         }
///     }
/// }
///
/// let marker = Marker { name: "a".into(), exists: false };
/// assert_eq!(marker.plan().unwrap().action, Action::Create);
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource within its type
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and target filters
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    fn current_state(&self) -> Result<ResourceState>;

    /// Get the desired state for this resource
    ///
    /// This is typically derived from configuration.
    fn desired_state(&self) -> ResourceState;

    /// Decide what has to happen to reach the desired state
    ///
    /// The default derives the action from the two states: absent to
    /// present creates, present to absent deletes, any other difference
    /// updates in place. Override when some differences need a replace.
    fn plan(&self) -> Result<PlannedChange> {
        let current = self.current_state()?;
        let desired = self.desired_state();
        Ok(default_plan(&current, &desired))
    }

    /// Check if the resource needs changes to reach desired state
    fn needs_apply(&self) -> Result<bool> {
        Ok(self.plan()?.is_change())
    }

    /// Carry out a planned change
    ///
    /// Implementations should respect `ctx.dry_run` by returning
    /// [`ApplyResult::Skipped`] without touching anything.
    fn apply(&self, ctx: &ApplyContext, change: &PlannedChange) -> Result<ApplyResult>;

    /// Whether this resource can be applied in parallel with others
    fn can_parallelize(&self) -> bool {
        true
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with resources
pub trait ResourceExt {
    /// `type.id`, the form accepted by target filters
    fn address(&self) -> String;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn address(&self) -> String {
        format!("{}.{}", self.resource_type(), self.id())
    }
}

fn default_plan(current: &ResourceState, desired: &ResourceState) -> PlannedChange {
    if current == desired {
        return PlannedChange::no_op();
    }
    match (current.is_absent(), desired.is_absent()) {
        (true, false) => PlannedChange::new(Action::Create).because("does not exist"),
        (false, true) => PlannedChange::new(Action::Delete).because("no longer declared"),
        _ => PlannedChange::new(Action::Update)
            .because(format!("{} -> {}", current.summary(), desired.summary())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(details: &str) -> ResourceState {
        ResourceState::Present {
            details: Some(details.to_string()),
        }
    }

    #[test]
    fn test_default_plan() {
        assert_eq!(
            default_plan(&present("a"), &present("a")).action,
            Action::NoOp
        );
        assert_eq!(
            default_plan(&ResourceState::Absent, &present("a")).action,
            Action::Create
        );
        assert_eq!(
            default_plan(&present("a"), &ResourceState::Absent).action,
            Action::Delete
        );
        let update = default_plan(&present("a"), &present("b"));
        assert_eq!(update.action, Action::Update);
        assert_eq!(update.reasons, vec!["a -> b".to_string()]);
    }
}
