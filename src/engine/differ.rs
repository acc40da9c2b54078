//! Plan display

use anyhow::Result;
use colored::{ColoredString, Colorize};
use declarative::{Action, DiffSummary, ExecutionPlan, ResourceDiff, compute_diffs, group_by_type};

/// Plan every resource and keep the ones with something to do
pub fn plan_diffs(plan: &ExecutionPlan) -> Result<Vec<ResourceDiff>> {
    let mut diffs = compute_diffs(&plan.parallel)?;
    diffs.extend(compute_diffs(&plan.sequential)?);
    Ok(diffs)
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

/// Display a list of diffs grouped by resource type
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Planned Changes".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        let type_name = match resource_type.as_str() {
            crate::dashboard::RESOURCE_TYPE => "Dashboards",
            other => other,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            println!(
                "│   {} {:<30} {}",
                symbol(diff.action()),
                diff.resource_id,
                diff.description.dimmed()
            );
            for reason in &diff.change.reasons {
                println!("│       {}", reason.dimmed());
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", summary_line(&summary));
    if summary.is_destructive() {
        println!(
            "│ {}",
            "Dashboards marked - or ± will be moved to the trash".yellow()
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete",
        summary.creates, summary.updates, summary.replaces, summary.deletes
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let summary = DiffSummary {
            creates: 1,
            updates: 2,
            replaces: 0,
            deletes: 3,
        };
        assert_eq!(
            summary_line(&summary),
            "Plan: 1 to create, 2 to update, 0 to replace, 3 to delete"
        );
    }
}
