//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, planning the action that converges each
//! resource, and applying those actions.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed
//! - **ResourceState**: The current or desired state of a resource
//! - **Action / PlannedChange**: Create, Update, Replace, Delete or nothing
//! - **ExecutionPlan**: Resources grouped into parallel and sequential batches
//! - **Executor**: Plans, confirms and applies, on a rayon thread pool
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     Action, ApplyContext, ApplyResult, ExecuteOptions, ExecutionPlan, PlannedChange,
//!     Resource, ResourceState, execute_simple,
//! };
//!
//! #[derive(Debug)]
//! struct Marker(&'static str);
//!
//! impl Resource for Marker {
//!     fn id(&self) -> String { self.0.to_string() }
//!     fn description(&self) -> String { format!("Marker {}", self.0) }
//!     fn resource_type(&self) -> &'static str { "marker" }
//!
//!     fn current_state(&self) -> anyhow::Result<ResourceState> {
//!         Ok(ResourceState::Absent)
//!     }
//!
//!     fn desired_state(&self) -> ResourceState {
//!         ResourceState::Present { details: None }
//!     }
//!
//!     fn apply(&self, ctx: &ApplyContext, change: &PlannedChange) -> anyhow::Result<ApplyResult> {
//!         if ctx.dry_run {
//!             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
//!         }
//!         assert_eq!(change.action, Action::Create);
//!         Ok(ApplyResult::Created)
//!     }
//! }
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(Marker("a")));
//!
//! let summary = execute_simple(&plan, &ExecuteOptions::default()).unwrap();
//! assert_eq!(summary.created, 1);
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use types::{Action, ApplyResult, ExecuteOptions, ExecuteSummary, PlannedChange, ResourceState};
