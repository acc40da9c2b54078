//! Execution engine - declarative executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    Action, ApplyResult, AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteSummary,
    ExecutionPlan, ProgressCallback, execute,
};

use super::differ::{display_diff, plan_diffs};

/// Options for an apply run, including `yes` to skip the confirmation
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            verbose: false,
        }
    }
}

/// Display the plan, confirm and apply it
pub fn apply(plan: &ExecutionPlan, opts: &ApplyOptions) -> Result<ExecuteSummary> {
    let diffs = plan_diffs(plan)?;
    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs.max(1),
        verbose: opts.verbose,
    };
    let mut progress = TerminalProgress::new(opts.verbose);

    let summary = if opts.yes {
        execute(plan, &exec_opts, &mut progress, &mut AutoConfirm)?
    } else {
        execute(plan, &exec_opts, &mut progress, &mut PromptConfirm)?
    };

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.total_changes() == 0 && summary.failed == 0 && summary.skipped > 0 {
        println!();
        println!("  {} Aborted", "✗".red());
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Prints one line per finished resource
struct TerminalProgress {
    verbose: bool,
}

impl TerminalProgress {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_batch_start(&mut self, count: usize, parallel: bool) {
        println!();
        println!(
            "  {} Applying {} dashboard{}{}...",
            "→".cyan(),
            count,
            if count == 1 { "" } else { "s" },
            if parallel { " in parallel" } else { "" }
        );
    }

    fn on_resource_start(&mut self, address: &str, action: Action) {
        if self.verbose {
            println!("    {} {} ({})", "…".dimmed(), address, action);
        }
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => println!("    {} {}", "○".dimmed(), address),
            ApplyResult::Created => println!("    {} {} created", "✓".green(), address),
            ApplyResult::Modified => println!("    {} {} updated", "✓".green(), address),
            ApplyResult::Replaced => println!("    {} {} replaced", "✓".green(), address),
            ApplyResult::Removed => println!("    {} {} trashed", "✓".green(), address),
            ApplyResult::Failed { error } => {
                println!("    {} {}: {}", "✗".red(), address, error);
            }
            ApplyResult::Skipped { reason } => {
                println!("    {} {} ({})", "⊘".dimmed(), address, reason);
            }
        }
    }

    fn on_batch_complete(&mut self) {}
}

/// Confirm with user
struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        println!();
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Dashboards applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Dashboards applied with errors", "⚠".yellow().bold());
    }

    for line in summary_lines(summary) {
        println!("    • {line}");
    }
}

fn summary_lines(summary: &ExecuteSummary) -> Vec<String> {
    [
        (summary.created, "created"),
        (summary.modified, "updated"),
        (summary.replaced, "replaced"),
        (summary.removed, "trashed"),
        (summary.skipped, "skipped"),
        (summary.failed, "failed"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, verb)| {
        let noun = if count == 1 { "dashboard" } else { "dashboards" };
        format!("{count} {noun} {verb}")
    })
    .collect()
}
