//! The default command: query to pattern to engine run.

use anyhow::Result;
use colored::Colorize;
use derp_core::{
    ColorMode, CompletionResult, Config, EnginePreference, PreviewOptions, ProviderClient,
    QueryKind, SearchCommand, classify_query, resolve_engine, translate,
};
use std::time::Duration;
use tracing::debug;

use crate::output::Spinner;

/// Flags that shape one search.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SearchOptions {
    /// Print the command instead of running it.
    pub dry_run: bool,
    /// Print pattern, arguments and explanation.
    pub explain: bool,
    /// Number of preview lines to show before running; dry runs skip it.
    pub preview: Option<usize>,
    /// Skip the model and use the query verbatim.
    pub literal: bool,
    /// Engine override from the command line.
    pub engine: Option<EnginePreference>,
    /// Color flag injected into the engine command.
    pub color: ColorMode,
    /// Suppress notices and the spinner.
    pub quiet: bool,
}

/// Run one search and return the exit code to use.
///
/// # Errors
///
/// Resolution, provider, timeout and spawn failures are returned as
/// `derp_core::Error` inside the `anyhow::Error`.
pub async fn run(
    query: &str,
    engine_args: &[String],
    options: &SearchOptions,
    config: &Config,
) -> Result<i32> {
    // Resolve first so a missing engine fails before any model call.
    let engine = resolve_engine(options.engine.unwrap_or(config.engine))?;

    let result = match classify_query(query, options.literal) {
        QueryKind::Literal => {
            if !options.literal && !options.quiet {
                eprintln!(
                    "{}",
                    "Query doesn't look like natural language. Using as-is as regex.".yellow()
                );
            }
            CompletionResult::new(query, Vec::new(), None)?
        },
        QueryKind::NaturalLanguage => ask_model(query, config, options.quiet).await?,
    };
    debug!(pattern = result.pattern(), args = ?result.arguments(), "pattern ready");

    let command = SearchCommand::assemble(
        &engine,
        result.pattern(),
        result.arguments(),
        engine_args,
        options.color,
    );

    if options.explain && !options.dry_run {
        print_explanation(&result, &command);
    }

    if let Some(limit) = options.preview.filter(|_| !options.dry_run) {
        print_preview(&command, limit).await;
    }

    if options.dry_run {
        println!("{}", command.render());
        if options.explain {
            if let Some(explanation) = result.explanation() {
                println!("\n{}{explanation}", "Explanation: ".dimmed());
            }
        }
        return Ok(0);
    }

    Ok(command.execute().await?)
}

async fn ask_model(query: &str, config: &Config, quiet: bool) -> Result<CompletionResult> {
    let backend = ProviderClient::from_config(config)?;
    let timeout = Duration::from_secs(config.timeout_secs);

    let spinner = Spinner::start(quiet);
    let outcome = translate(query, &backend, timeout).await;
    spinner.stop();

    Ok(outcome?)
}

fn print_explanation(result: &CompletionResult, command: &SearchCommand) {
    println!("{}{}", "Regex: ".cyan(), result.pattern());
    println!("{}{}", "Args: ".cyan(), command.argv().join(" "));
    if let Some(explanation) = result.explanation() {
        println!("{}{explanation}", "Explanation: ".dimmed());
    }
    println!();
}

async fn print_preview(command: &SearchCommand, limit: usize) {
    let lines = command
        .preview(PreviewOptions::default().with_limit(limit))
        .await;

    if lines.is_empty() {
        println!("{}", "Preview: no matches".dimmed());
    } else {
        println!("{}", "Preview:".bold());
        for line in lines {
            println!("  {line}");
        }
    }
    println!();
}
