//! Offline project file check

use anyhow::{Result, bail};

use super::Project;
use crate::Context;
use crate::dashboard::{ContentResolver, DesiredDashboard, ResolveContext};
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let project = Project::load(ctx)?;

    ui::header("Validate");
    ui::kv("Project", &project.config_path.display().to_string());
    ui::kv("State", &project.state_path.display().to_string());
    println!();

    let problems = project.config.validate(&project.schema);
    if !problems.is_empty() {
        for problem in &problems {
            ui::error(problem);
        }
        bail!(
            "{} problem{} in {}",
            problems.len(),
            if problems.len() == 1 { "" } else { "s" },
            project.config_path.display()
        );
    }

    let desired = project.desired()?;
    let failures = check_content(&project.resolver(), desired.iter(), ctx.quiet);
    if failures > 0 {
        bail!(
            "{failures} dashboard{} without usable content",
            if failures == 1 { "" } else { "s" }
        );
    }

    if !ctx.quiet {
        println!();
    }
    ui::success(&format!(
        "{} dashboard{} valid",
        desired.len(),
        if desired.len() == 1 { "" } else { "s" }
    ));
    Ok(())
}

/// Resolve every dashboard's content as a create would; returns the
/// number of failures
fn check_content<'a>(
    resolver: &ContentResolver,
    dashboards: impl Iterator<Item = (&'a String, &'a DesiredDashboard)>,
    quiet: bool,
) -> usize {
    let mut failures = 0;
    for (name, dashboard) in dashboards {
        match resolver.resolve(dashboard.content.as_ref(), ResolveContext::Create) {
            Ok(Some(resolved)) => {
                if !quiet {
                    ui::success(&format!(
                        "dashboard.{name} ({} bytes, {})",
                        resolved.content.len(),
                        ui::short(&resolved.fingerprint, 12)
                    ));
                }
            }
            Ok(None) => {
                failures += 1;
                ui::error(&format!("dashboard.{name}: no content"));
            }
            Err(e) => {
                failures += 1;
                ui::error(&format!("dashboard.{name}: {e}"));
                ui::dim(e.advice());
            }
        }
    }
    failures
}
