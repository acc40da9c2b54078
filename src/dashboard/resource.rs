//! Dashboards as declarative resources
//!
//! A [`DashboardResource`] pairs what the config declares with what the
//! state file recorded after the last refresh, and decides which lifecycle
//! operation converges the two. The [`LifecycleController`] carries it out.

use super::content::{ContentResolver, ResolveContext};
use super::controller::LifecycleController;
use super::drift::should_push;
use super::error::ControllerError;
use super::schema::ResourceSchema;
use super::{DesiredDashboard, PersistedState, RESOURCE_TYPE};
use crate::state::StateStore;
use anyhow::{Context, Result, bail};
use declarative::{Action, ApplyContext, ApplyResult, PlannedChange, Resource, ResourceState};
use lakeview::Backend;
use std::fmt;
use std::sync::Arc;

/// Everything a dashboard needs to plan and apply, shared by all of them
pub struct Session {
    pub backend: Arc<dyn Backend>,
    pub resolver: ContentResolver,
    pub store: StateStore,
    pub schema: ResourceSchema,
}

impl Session {
    pub fn controller(&self) -> LifecycleController<'_> {
        LifecycleController::new(self.backend.as_ref(), &self.resolver)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_dir", &self.resolver.base_dir())
            .field("state", &self.store.path())
            .finish_non_exhaustive()
    }
}

/// One declared or tracked dashboard
#[derive(Debug)]
pub struct DashboardResource {
    name: String,
    desired: Option<DesiredDashboard>,
    recorded: Option<PersistedState>,
    session: Arc<Session>,
}

impl DashboardResource {
    /// `desired` is `None` for a dashboard that is tracked but no longer
    /// declared. The recorded state is taken from the store as it is now.
    pub fn new(name: impl Into<String>, desired: Option<DesiredDashboard>, session: Arc<Session>) -> Self {
        let name = name.into();
        let recorded = session.store.get(&name);
        Self {
            name,
            desired,
            recorded,
            session,
        }
    }

    fn plan_existing(&self, desired: &DesiredDashboard, recorded: &PersistedState) -> Result<PlannedChange> {
        let wanted = desired.attributes();
        let mut replace = PlannedChange::new(Action::Replace);
        let mut update = PlannedChange::new(Action::Update);

        for attribute in self.session.schema.configurable() {
            let name = attribute.name();
            let (Some(old), Some(new)) = (recorded.applied.value(name), wanted.value(name)) else {
                continue;
            };
            if !attribute.differs(&old, &new) {
                continue;
            }
            let reason = format!("{name}: \"{old}\" -> \"{new}\"");
            if attribute.is_force_new() {
                replace = replace.because(format!("{reason} (forces replacement)"));
            } else {
                update = update.because(reason);
            }
        }

        if !replace.reasons.is_empty() {
            return Ok(replace);
        }

        let resolved = self
            .session
            .resolver
            .resolve(desired.content.as_ref(), ResolveContext::Update)
            .with_context(|| format!("Failed to resolve content of {}", self.name))?;
        if let Some(resolved) = resolved {
            if should_push(&recorded.fingerprint, &resolved.fingerprint, recorded.drift_observed) {
                update = update.because(if recorded.drift_observed {
                    "modified outside dashctl"
                } else {
                    "content changed"
                });
            }
        }

        if update.reasons.is_empty() {
            Ok(PlannedChange::no_op())
        } else {
            Ok(update)
        }
    }

    fn desired(&self) -> Result<&DesiredDashboard> {
        match &self.desired {
            Some(desired) => Ok(desired),
            None => bail!("{} is not declared in the config", self.name),
        }
    }

    fn recorded(&self) -> Result<&PersistedState> {
        match &self.recorded {
            Some(recorded) => Ok(recorded),
            None => bail!("{} is not tracked in the state file", self.name),
        }
    }

    fn create(&self) -> Result<()> {
        let desired = self.desired()?;
        let created = self
            .session
            .controller()
            .create(desired)
            .map_err(|e| self.failure("create", e))?;
        self.session.store.record(
            &self.name,
            PersistedState::from_created(created, desired.attributes()),
        )
    }

    fn update(&self) -> Result<()> {
        let desired = self.desired()?;
        let recorded = self.recorded()?;
        let updated = self
            .session
            .controller()
            .update(recorded, desired)
            .map_err(|e| self.failure("update", e))?;

        let mut state = recorded.clone();
        state.record_update(updated, desired.attributes());
        self.session.store.record(&self.name, state)
    }

    fn delete(&self) -> Result<()> {
        let recorded = self.recorded()?;
        self.session
            .controller()
            .delete(&recorded.dashboard_id)
            .map_err(|e| self.failure("delete", e))?;
        self.session.store.forget(&self.name)?;
        Ok(())
    }

    fn failure(&self, verb: &str, error: ControllerError) -> anyhow::Error {
        let advice = error.advice();
        anyhow::Error::new(error).context(format!("Failed to {verb} {} ({advice})", self.name))
    }
}

impl Resource for DashboardResource {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        match (&self.desired, &self.recorded) {
            (Some(desired), _) => format!("{} in {}", desired.display_name, desired.parent_path),
            (None, Some(recorded)) => format!(
                "{} in {}",
                recorded.applied.display_name, recorded.applied.parent_path
            ),
            (None, None) => self.name.clone(),
        }
    }

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(match &self.recorded {
            None => ResourceState::Absent,
            Some(recorded) if recorded.drift_observed => ResourceState::Modified {
                from: recorded.etag.clone(),
                to: recorded
                    .last_seen
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), |seen| seen.etag.clone()),
            },
            Some(recorded) => ResourceState::Present {
                details: Some(recorded.dashboard_id.clone()),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        match &self.desired {
            None => ResourceState::Absent,
            Some(desired) => ResourceState::Present {
                details: Some(desired.display_name.clone()),
            },
        }
    }

    fn plan(&self) -> Result<PlannedChange> {
        match (&self.desired, &self.recorded) {
            (None, None) => Ok(PlannedChange::no_op()),
            (Some(_), None) => Ok(PlannedChange::new(Action::Create).because("not created yet")),
            (None, Some(_)) => {
                Ok(PlannedChange::new(Action::Delete).because("no longer declared"))
            }
            (Some(desired), Some(recorded)) => self.plan_existing(desired, recorded),
        }
    }

    fn apply(&self, ctx: &ApplyContext, change: &PlannedChange) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        match change.action {
            Action::NoOp => Ok(ApplyResult::NoChange),
            Action::Create => {
                self.create()?;
                Ok(ApplyResult::Created)
            }
            Action::Update => {
                self.update()?;
                Ok(ApplyResult::Modified)
            }
            Action::Replace => {
                self.delete()?;
                self.create()?;
                Ok(ApplyResult::Replaced)
            }
            Action::Delete => {
                self.delete()?;
                Ok(ApplyResult::Removed)
            }
        }
    }
}
