use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dashctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Keep Lakeview dashboards in line with a project file", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project file (default: ./dashctl.toml, or $DASHCTL_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// State file (default: .dashctl/state.toml next to the project file)
    #[arg(long, global = true, value_name = "FILE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the project file and resolve every dashboard's content
    Validate,

    /// Re-read tracked dashboards and record drift or removal
    Refresh,

    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update, replace or trash dashboards to match the project file
    Apply(ApplyArgs),

    /// Trash every tracked dashboard
    Destroy(DestroyArgs),

    /// Show tracked dashboards (no network access)
    Status,

    /// Show the recorded state of one dashboard
    Show {
        /// Dashboard name from the project file, or its dashboard id
        name: String,
    },

    /// Diff the remote definition of a dashboard against the local one
    Diff {
        /// Dashboard name from the project file
        name: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Limit to `dashboard` or `dashboard.NAME`
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Limit to `dashboard` or `dashboard.NAME`
    pub target: Option<String>,

    /// Show what would change without changing it
    #[arg(long)]
    pub dry_run: bool,

    /// Number of dashboards applied in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Limit to `dashboard` or `dashboard.NAME`
    pub target: Option<String>,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_args() {
        let cli = Cli::parse_from([
            "dashctl",
            "-vv",
            "--config",
            "p/dashctl.toml",
            "apply",
            "dashboard.sales",
            "--dry-run",
            "-j",
            "2",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("p/dashctl.toml")));
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.target.as_deref(), Some("dashboard.sales"));
                assert!(args.dry_run);
                assert_eq!(args.jobs, 2);
                assert!(!args.yes);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dashctl", "status", "-q", "--state", "/tmp/s.toml"]);
        assert!(cli.quiet);
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/s.toml")));
    }
}
