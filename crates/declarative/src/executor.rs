//! Execution engine - plans and applies resources with parallelism

use crate::context::{ApplyContext, AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::resource::{BoxedResource, Resource, ResourceExt};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, PlannedChange};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::{Mutex, PoisonError};

/// A resource paired with the change planned for it
type Work<'a> = (&'a dyn Resource, PlannedChange);

/// Execute a plan with the given options and callbacks
///
/// Every resource is planned first; if any resource cannot be planned
/// nothing is applied. Resources with nothing to do are counted as
/// `no_change`. Parallel resources run on a pool of `opts.jobs` threads,
/// then sequential resources run one at a time.
pub fn execute<P, C>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let mut summary = ExecuteSummary::default();

    let parallel = plan_batch(&plan.parallel, &mut summary)?;
    let sequential = plan_batch(&plan.sequential, &mut summary)?;
    let total_changes = parallel.len() + sequential.len();

    if total_changes == 0 {
        return Ok(summary);
    }

    if opts.dry_run {
        summary.skipped += total_changes;
        return Ok(summary);
    }

    let prompt = format!(
        "Apply {} change{}?",
        total_changes,
        if total_changes == 1 { "" } else { "s" }
    );
    if !confirm.confirm(&prompt)? {
        summary.skipped += total_changes;
        return Ok(summary);
    }

    let ctx = ApplyContext::new(false, opts.verbose);

    if !parallel.is_empty() {
        progress.on_batch_start(parallel.len(), true);
        for result in execute_batch(&parallel, opts.jobs, &ctx, progress)? {
            summary.add_result(&result);
        }
        progress.on_batch_complete();
    }

    if !sequential.is_empty() {
        progress.on_batch_start(sequential.len(), false);
        for result in execute_batch(&sequential, 1, &ctx, progress)? {
            summary.add_result(&result);
        }
        progress.on_batch_complete();
    }

    Ok(summary)
}

/// Simple execution without callbacks
pub fn execute_simple(plan: &ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

/// Plan each resource, keeping only those with work to do
fn plan_batch<'a>(
    resources: &'a [BoxedResource],
    summary: &mut ExecuteSummary,
) -> Result<Vec<Work<'a>>> {
    let mut work = Vec::new();
    for resource in resources {
        let change = resource
            .plan()
            .with_context(|| format!("Failed to plan {}", resource.address()))?;
        if change.is_change() {
            work.push((resource.as_ref(), change));
        } else {
            summary.no_change += 1;
        }
    }
    Ok(work)
}

/// Execute a batch of resources
fn execute_batch<P: ProgressCallback>(
    work: &[Work<'_>],
    jobs: usize,
    ctx: &ApplyContext,
    progress: &mut P,
) -> Result<Vec<ApplyResult>> {
    if jobs <= 1 || work.len() == 1 {
        let mut results = Vec::with_capacity(work.len());
        for (resource, change) in work {
            let address = resource.address();
            progress.on_resource_start(&address, change.action);
            let result = apply_resource(*resource, ctx, change);
            progress.on_resource_complete(&address, &result);
            results.push(result);
        }
        Ok(results)
    } else {
        execute_parallel(work, jobs, ctx, progress)
    }
}

/// Execute resources in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    work: &[Work<'_>],
    jobs: usize,
    ctx: &ApplyContext,
    progress: &mut P,
) -> Result<Vec<ApplyResult>> {
    // The progress callback is not thread-safe, so results are reported
    // after the pool finishes.
    let results: Mutex<Vec<(String, ApplyResult)>> = Mutex::new(Vec::with_capacity(work.len()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to create thread pool")?;

    pool.install(|| {
        work.par_iter().for_each(|(resource, change)| {
            let result = apply_resource(*resource, ctx, change);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((resource.address(), result));
        });
    });

    let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);

    for (address, result) in &results {
        progress.on_resource_complete(address, result);
    }

    Ok(results.into_iter().map(|(_, r)| r).collect())
}

/// Apply a single resource, turning errors into [`ApplyResult::Failed`]
fn apply_resource(resource: &dyn Resource, ctx: &ApplyContext, change: &PlannedChange) -> ApplyResult {
    match resource.apply(ctx, change) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AutoDecline;
    use crate::types::{Action, ResourceState};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestResource {
        id: String,
        action: Action,
        fail: bool,
        applied: Arc<AtomicUsize>,
    }

    impl TestResource {
        fn boxed(id: &str, action: Action, applied: &Arc<AtomicUsize>) -> BoxedResource {
            Box::new(Self {
                id: id.to_string(),
                action,
                fail: false,
                applied: Arc::clone(applied),
            })
        }
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(ResourceState::Unknown)
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Unknown
        }

        fn plan(&self) -> Result<PlannedChange> {
            Ok(PlannedChange::new(self.action))
        }

        fn apply(&self, ctx: &ApplyContext, change: &PlannedChange) -> Result<ApplyResult> {
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            self.applied.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("remote rejected {}", self.id);
            }
            Ok(match change.action {
                Action::NoOp => ApplyResult::NoChange,
                Action::Create => ApplyResult::Created,
                Action::Update => ApplyResult::Modified,
                Action::Replace => ApplyResult::Replaced,
                Action::Delete => ApplyResult::Removed,
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: Vec<String>,
        batches: usize,
    }

    impl ProgressCallback for Recorder {
        fn on_batch_start(&mut self, _count: usize, _parallel: bool) {
            self.batches += 1;
        }
        fn on_resource_start(&mut self, address: &str, _action: Action) {
            self.started.push(address.to_string());
        }
        fn on_resource_complete(&mut self, address: &str, _result: &ApplyResult) {
            self.completed.push(address.to_string());
        }
        fn on_batch_complete(&mut self) {}
    }

    #[test]
    fn test_execute_empty_plan() {
        let summary = execute_simple(&ExecutionPlan::new(), &ExecuteOptions::default()).unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let applied = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.add_resource(TestResource::boxed("a", Action::NoOp, &applied));

        let summary = execute_simple(&plan, &ExecuteOptions::default()).unwrap();
        assert_eq!(summary.no_change, 1);
        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_execute_parallel_changes() {
        let applied = Arc::new(AtomicUsize::new(0));
        let plan: ExecutionPlan = [
            TestResource::boxed("a", Action::Create, &applied),
            TestResource::boxed("b", Action::Update, &applied),
            TestResource::boxed("c", Action::Replace, &applied),
            TestResource::boxed("d", Action::Delete, &applied),
            TestResource::boxed("e", Action::NoOp, &applied),
        ]
        .into_iter()
        .collect();

        let mut progress = Recorder::default();
        let summary = execute(
            &plan,
            &ExecuteOptions::default(),
            &mut progress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.replaced, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(applied.load(Ordering::SeqCst), 4);
        assert_eq!(progress.completed.len(), 4);
        assert_eq!(progress.batches, 1);
    }

    #[test]
    fn test_execute_sequential_reports_start() {
        let applied = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.add_resource(TestResource::boxed("a", Action::Create, &applied));
        plan.add_resource(TestResource::boxed("b", Action::Create, &applied));

        let mut progress = Recorder::default();
        let opts = ExecuteOptions {
            jobs: 1,
            ..Default::default()
        };
        execute(&plan, &opts, &mut progress, &mut AutoConfirm).unwrap();
        assert_eq!(progress.started, vec!["test.a", "test.b"]);
    }

    #[test]
    fn test_execute_declined() {
        let applied = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.add_resource(TestResource::boxed("a", Action::Create, &applied));

        let summary = execute(
            &plan,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_execute_dry_run_applies_nothing() {
        let applied = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.add_resource(TestResource::boxed("a", Action::Delete, &applied));

        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = execute_simple(&plan, &opts).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_is_recorded_not_propagated() {
        let applied = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(TestResource {
            id: "bad".into(),
            action: Action::Update,
            fail: true,
            applied: Arc::clone(&applied),
        }));
        plan.add_resource(TestResource::boxed("good", Action::Create, &applied));

        let summary = execute_simple(&plan, &ExecuteOptions::default()).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
    }
}
