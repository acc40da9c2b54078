//! Reconciliation commands
//!
//! Every command that plans starts with a refresh, so the planner sees
//! trashed dashboards as gone and edits made in the workspace as drift.

use anyhow::{Result, bail};
use declarative::{BoxedResource, ExecutionPlan};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::Project;
use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs};
use crate::dashboard::resource::Session;
use crate::dashboard::{ControllerError, DashboardResource, DesiredDashboard, Observation};
use crate::engine::{self, ApplyOptions};
use crate::ui;

// ============================================================================
// Refresh
// ============================================================================

/// What a refresh found
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub checked: usize,
    /// Modified outside dashctl since the last apply
    pub drifted: Vec<String>,
    /// Trashed or deleted; no longer tracked
    pub gone: Vec<String>,
    pub failed: Vec<(String, ControllerError)>,
}

impl RefreshReport {
    fn print(&self, quiet: bool) {
        for name in &self.drifted {
            ui::warn(&format!("dashboard.{name} was modified outside dashctl"));
        }
        for name in &self.gone {
            ui::info(&format!(
                "dashboard.{name} is gone or in the trash; it is no longer tracked"
            ));
        }
        for (name, error) in &self.failed {
            ui::error(&failure_line(name, error));
            ui::dim(error.advice());
        }
        if self.only_transient_failures() {
            ui::dim("Every failure looks transient; run 'dashctl refresh' again");
        }
        if !quiet && self.failed.is_empty() {
            ui::success(&format!(
                "Refreshed {} dashboard{}",
                self.checked,
                if self.checked == 1 { "" } else { "s" }
            ));
        }
    }

    fn only_transient_failures(&self) -> bool {
        !self.failed.is_empty() && self.failed.iter().all(|(_, e)| e.is_retryable())
    }

    /// Planning on top of a partial refresh could undo remote changes
    fn ensure_complete(&self) -> Result<()> {
        if !self.failed.is_empty() {
            bail!(
                "Could not refresh {} dashboard{}",
                self.failed.len(),
                if self.failed.len() == 1 { "" } else { "s" }
            );
        }
        Ok(())
    }
}

/// One line per failed read, labelled with the service's error category
fn failure_line(name: &str, error: &ControllerError) -> String {
    match error.category() {
        Some(category) => format!("dashboard.{name}: {category}: {error}"),
        None => format!("dashboard.{name}: {error}"),
    }
}

/// Read every tracked dashboard and record what was seen
///
/// Reads run in parallel; state writes happen one at a time afterwards.
pub fn refresh_state(session: &Session) -> Result<RefreshReport> {
    let controller = session.controller();
    let tracked: Vec<_> = session
        .store
        .names()
        .into_iter()
        .filter_map(|name| session.store.get(&name).map(|state| (name, state)))
        .collect();

    let observations: Vec<_> = tracked
        .into_par_iter()
        .map(|(name, state)| {
            let observation = controller.read(&state);
            (name, state, observation)
        })
        .collect();

    let mut report = RefreshReport::default();
    for (name, mut state, observation) in observations {
        report.checked += 1;
        match observation {
            Ok(Observation::Absent) => {
                session.store.forget(&name)?;
                report.gone.push(name);
            }
            Ok(Observation::Present { dashboard, drift }) => {
                state.record_read(&dashboard, drift);
                session.store.record(&name, state)?;
                if drift {
                    report.drifted.push(name);
                }
            }
            Err(e) => report.failed.push((name, e)),
        }
    }

    Ok(report)
}

// ============================================================================
// Plans
// ============================================================================

/// One resource per declared dashboard plus one per tracked dashboard that
/// is no longer declared
pub fn build_plan(
    session: &Arc<Session>,
    desired: BTreeMap<String, DesiredDashboard>,
    target: Option<&str>,
) -> ExecutionPlan {
    let undeclared: Vec<String> = session
        .store
        .names()
        .into_iter()
        .filter(|name| !desired.contains_key(name))
        .collect();

    desired
        .into_iter()
        .map(|(name, dashboard)| (name, Some(dashboard)))
        .chain(undeclared.into_iter().map(|name| (name, None)))
        .map(|(name, dashboard)| {
            Box::new(DashboardResource::new(name, dashboard, Arc::clone(session))) as BoxedResource
        })
        .collect::<ExecutionPlan>()
        .filter_by_target(target)
}

/// A delete for every tracked dashboard
pub fn destroy_plan(session: &Arc<Session>, target: Option<&str>) -> ExecutionPlan {
    session
        .store
        .names()
        .into_iter()
        .map(|name| Box::new(DashboardResource::new(name, None, Arc::clone(session))) as BoxedResource)
        .collect::<ExecutionPlan>()
        .filter_by_target(target)
}

// ============================================================================
// Commands
// ============================================================================

pub fn refresh(ctx: &Context) -> Result<()> {
    let project = Project::load(ctx)?;
    let session = project.connect()?;

    ui::header("Refresh");
    let report = refresh_state(&session)?;
    report.print(ctx.quiet);
    report.ensure_complete()
}

pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    let project = Project::load(ctx)?;
    let desired = project.desired()?;
    let session = project.connect()?;

    let report = refresh_state(&session)?;
    report.print(true);
    report.ensure_complete()?;

    let plan = build_plan(&session, desired, target);
    let diffs = engine::differ::plan_diffs(&plan)?;
    engine::differ::display_diff(&diffs);
    Ok(())
}

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let project = Project::load(ctx)?;
    let desired = project.desired()?;
    let session = project.connect()?;

    let report = refresh_state(&session)?;
    report.print(true);
    report.ensure_complete()?;

    let plan = build_plan(&session, desired, args.target.as_deref());
    let opts = ApplyOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs),
        yes: args.yes,
        verbose: ctx.verbose > 0,
    };
    finish(engine::apply(&plan, &opts)?)
}

pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let project = Project::load(ctx)?;
    let session = project.connect()?;

    let report = refresh_state(&session)?;
    report.print(true);
    report.ensure_complete()?;

    let plan = destroy_plan(&session, args.target.as_deref());
    let opts = ApplyOptions {
        yes: args.yes,
        verbose: ctx.verbose > 0,
        ..Default::default()
    };
    finish(engine::apply(&plan, &opts)?)
}

fn finish(summary: declarative::ExecuteSummary) -> Result<()> {
    if !summary.is_success() {
        bail!(
            "{} dashboard{} failed",
            summary.failed,
            if summary.failed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
