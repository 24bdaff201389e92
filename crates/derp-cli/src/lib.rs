//! derp CLI - Natural language grep for regex-challenged developers
//!
//! This is the library behind the `derp` binary. [`run`] parses the command
//! line, dispatches to `--init`, `--config` or a search, and maps every
//! outcome to a process exit code.

use anyhow::Result;
use clap::CommandFactory;
use colored::Colorize;
use derp_core::{ColorMode, Config};
use std::ffi::OsString;
use std::process::ExitCode;

mod cli;
mod commands;
pub mod error;
mod output;
mod utils;

use crate::cli::Cli;
use crate::commands::SearchOptions;
use crate::error::{CliError, categorize};
use crate::utils::{color_disabled, initialize_logging};

/// Execute the derp CLI with the given arguments (program name first).
///
/// Never panics on bad input; every failure is printed as a one-line message
/// on stderr and turned into an exit code.
pub async fn run<I, S>(args: I) -> ExitCode
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_split(args) {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version arrive here too, with exit code 0.
            let _ = err.print();
            return exit_code(err.exit_code());
        },
    };

    if cli.is_empty() {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    if let Err(err) = initialize_logging(&cli) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match execute(&cli).await {
        Ok(code) => exit_code(code),
        Err(err) => {
            report(&err, cli.verbose);
            ExitCode::from(categorize(&err).exit_code())
        },
    }
}

async fn execute(cli: &Cli) -> Result<i32> {
    if cli.init {
        commands::init::run()?;
        return Ok(0);
    }
    if cli.config {
        commands::show_config::run()?;
        return Ok(0);
    }

    let query = cli
        .query
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| CliError::usage("No query provided. Run `derp --help` for usage."))?;

    let options = SearchOptions {
        dry_run: cli.dry_run,
        explain: cli.explain,
        preview: cli.preview,
        literal: cli.literal,
        engine: cli.engine,
        color: if color_disabled(cli) {
            ColorMode::Never
        } else {
            ColorMode::Always
        },
        quiet: cli.quiet,
    };

    let config = Config::load();
    commands::search::run(query, &cli.engine_args, &options, &config).await
}

fn report(err: &anyhow::Error, verbose: bool) {
    eprintln!("{} {err}", "Error:".red().bold());
    if verbose {
        eprintln!("{err:?}");
    }
    let recoverable = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<derp_core::Error>())
        .is_some_and(derp_core::Error::is_recoverable);
    if recoverable {
        eprintln!("{}", "This may be temporary; try again in a moment.".dimmed());
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
