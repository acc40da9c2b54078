//! Read-only commands: status, show and diff

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use std::collections::BTreeSet;

use super::Project;
use crate::Context;
use crate::dashboard::{PersistedState, ResolveContext};
use crate::state::StateFile;
use crate::ui;

// ============================================================================
// Status
// ============================================================================

/// How a dashboard looks from the project file and state file alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    /// Declared and tracked
    Tracked,
    /// Declared and tracked, and the last refresh saw outside edits
    Drifted,
    /// Declared but never created (or trashed since)
    NotCreated,
    /// Tracked but no longer declared
    Undeclared,
}

#[derive(Debug)]
struct StatusRow {
    name: String,
    dashboard_id: Option<String>,
    condition: Condition,
}

fn status_rows(declared: &BTreeSet<&str>, state: &StateFile) -> Vec<StatusRow> {
    let mut names: BTreeSet<&str> = declared.clone();
    names.extend(state.dashboards.keys().map(String::as_str));

    names
        .into_iter()
        .map(|name| {
            let tracked = state.dashboards.get(name);
            let condition = match (declared.contains(name), tracked) {
                (true, Some(s)) if s.drift_observed => Condition::Drifted,
                (true, Some(_)) => Condition::Tracked,
                (true, None) => Condition::NotCreated,
                (false, _) => Condition::Undeclared,
            };
            StatusRow {
                name: name.to_string(),
                dashboard_id: tracked.map(|s| s.dashboard_id.clone()),
                condition,
            }
        })
        .collect()
}

pub fn status(ctx: &Context) -> Result<()> {
    let project = Project::load(ctx)?;
    let state = project.store()?.snapshot();
    let declared: BTreeSet<&str> = project.config.dashboards.keys().map(String::as_str).collect();
    let rows = status_rows(&declared, &state);

    ui::header("Dashboards");
    if rows.is_empty() {
        ui::dim("No dashboards declared or tracked");
        return Ok(());
    }

    for row in &rows {
        let (symbol, note) = match row.condition {
            Condition::Tracked => ("✓".green(), String::new()),
            Condition::Drifted => ("~".yellow(), "modified outside dashctl".yellow().to_string()),
            Condition::NotCreated => ("+".green(), "not created".dimmed().to_string()),
            Condition::Undeclared => ("-".red(), "no longer declared".red().to_string()),
        };
        println!(
            "  {} {:<24} {:<34} {}",
            symbol,
            row.name,
            row.dashboard_id.as_deref().unwrap_or("").dimmed(),
            note
        );
    }

    if !ctx.quiet {
        println!();
        ui::kv("State", &project.state_path.display().to_string());
        ui::kv(
            "Last updated",
            &state.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        ui::dim("Run 'dashctl refresh' to check the workspace");
    }
    Ok(())
}

// ============================================================================
// Show
// ============================================================================

pub fn show(ctx: &Context, name: &str) -> Result<()> {
    let project = Project::load(ctx)?;
    let store = project.store()?;

    // NAME may also be a remote dashboard id
    let (name, state) = match store.get(name) {
        Some(state) => (name.to_string(), state),
        None => store
            .find_by_remote_id(name)
            .with_context(|| format!("dashboard.{name} is not tracked"))?,
    };

    print_state(&name, &state);
    Ok(())
}

fn print_state(name: &str, state: &PersistedState) {
    ui::header(&format!("dashboard.{name}"));
    ui::kv("Dashboard id", &state.dashboard_id);
    if let Some(path) = &state.path {
        ui::kv("Path", path);
    }
    ui::kv("Etag", &state.etag);
    ui::kv("Fingerprint", ui::short(&state.fingerprint, 16));
    ui::kv("Updated", &state.updated_at.to_rfc3339());
    if state.drift_observed {
        ui::warn("Modified outside dashctl; the next apply overwrites it");
    }

    ui::section("Applied");
    ui::kv("Display name", &state.applied.display_name);
    ui::kv("Parent path", &state.applied.parent_path);
    ui::kv("Warehouse", &state.applied.warehouse_id);
    ui::kv(
        "Embed credentials",
        &state.applied.embed_credentials.to_string(),
    );

    if let Some(seen) = &state.last_seen {
        ui::section("Last refresh");
        ui::kv("Lifecycle state", &format!("{:?}", seen.lifecycle_state));
        ui::kv("Etag", &seen.etag);
        if let Some(update_time) = &seen.update_time {
            ui::kv("Remote update time", update_time);
        }
        ui::kv("Checked", &seen.checked_at.to_rfc3339());
    }
}

// ============================================================================
// Diff
// ============================================================================

pub fn diff(ctx: &Context, name: &str) -> Result<()> {
    let project = Project::load(ctx)?;
    let desired = project.desired()?;
    let dashboard = desired
        .get(name)
        .with_context(|| format!("dashboard.{name} is not declared"))?;

    let session = project.connect()?;
    let state = session
        .store
        .get(name)
        .with_context(|| format!("dashboard.{name} is not tracked; run 'dashctl apply' first"))?;

    let remote = session
        .backend
        .get(&state.dashboard_id)
        .with_context(|| format!("Failed to fetch dashboard {}", state.dashboard_id))?;
    let local = session
        .resolver
        .resolve(dashboard.content.as_ref(), ResolveContext::Update)?
        .with_context(|| format!("dashboard.{name} has no local content to compare"))?;

    let remote_text = pretty_json(remote.serialized_dashboard.as_deref().unwrap_or_default());
    let local_text = pretty_json(&local.content);

    ui::header(&format!("dashboard.{name}"));
    ui::dim("- remote   + local");
    let lines = diff_lines(&remote_text, &local_text);
    if lines.is_empty() {
        println!("    {}", "(definitions are identical)".dimmed());
    }
    for line in lines {
        match line.chars().next() {
            Some('-') => println!("    {}", line.red()),
            Some('+') => println!("    {}", line.green()),
            _ => println!("    {line}"),
        }
    }
    Ok(())
}

/// Re-indent JSON so both sides diff line by line; non-JSON is kept as is
fn pretty_json(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| text.to_string())
}

/// Changed lines only, prefixed with `- ` or `+ `
fn diff_lines(old: &str, new: &str) -> Vec<String> {
    let diff = similar::TextDiff::from_lines(old, new);
    diff.iter_all_changes()
        .filter_map(|change| {
            let prefix = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => return None,
            };
            Some(format!("{prefix} {}", change.value().trim_end_matches('\n')))
        })
        .collect()
}
