mod cli;
mod commands;
mod config;
mod dashboard;
mod engine;
mod paths;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// `--config` as given on the command line
    pub config: Option<PathBuf>,
    /// `--state` as given on the command line
    pub state: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        state: cli.state,
    };

    match cli.command {
        Command::Validate => commands::validate::run(&ctx),
        Command::Refresh => commands::lifecycle::refresh(&ctx),
        Command::Plan(args) => commands::lifecycle::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::lifecycle::apply(&ctx, &args),
        Command::Destroy(args) => commands::lifecycle::destroy(&ctx, &args),
        Command::Status => commands::inspect::status(&ctx),
        Command::Show { name } => commands::inspect::show(&ctx, &name),
        Command::Diff { name } => commands::inspect::diff(&ctx, &name),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "dashctl", &mut io::stdout());
            Ok(())
        }
    }
}
