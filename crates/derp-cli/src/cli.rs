//! # CLI Structure and Argument Parsing
//!
//! `derp` takes a query followed by arguments for the search engine:
//!
//! ```bash
//! derp "emails in files" -r .
//! derp "TODO comments" src/ --dry-run
//! derp "IP addresses" logs/*.log --explain
//! derp '^foo.*bar$' --engine grep
//! ```
//!
//! derp's own long options are recognised anywhere on the command line and
//! everything else is handed to the engine untouched. Because clap cannot
//! express "some flags anywhere, all others passthrough", the raw arguments
//! are first split by [`split_args`] and only derp's share is parsed by clap;
//! the engine's share follows a `--` so clap treats it as positional.

use clap::Parser;
use derp_core::EnginePreference;
use std::ffi::OsString;

/// derp's own long options. Anything else belongs to the engine.
const DERP_SWITCHES: &[&str] = &[
    "--dry-run",
    "--explain",
    "--init",
    "--config",
    "--help",
    "--literal",
    "--verbose",
    "--quiet",
    "--no-color",
    "--version",
    "--preview",
];

/// Options that take a separate value.
const DERP_VALUE_OPTIONS: &[&str] = &["--engine"];

/// Natural language grep for regex-challenged developers.
#[derive(Parser, Clone, Debug, Default, PartialEq, Eq)]
#[command(name = "derp")]
#[command(version)]
#[command(about = "derp - Natural language grep for regex-challenged developers", long_about = None)]
#[command(override_usage = "derp <QUERY> [ENGINE_ARGS]... [OPTIONS]\n       derp --init | --config")]
#[command(
    after_help = "EXAMPLES:\n  derp \"emails in files\" -r .\n  derp \"TODO comments\" src/ --dry-run\n  derp \"IP addresses\" logs/*.log --explain\n\nCONFIGURATION:\n  Run `derp --init` to configure your LLM provider."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Natural-language query, or a pattern to use as-is
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Arguments passed through to the search engine
    #[arg(value_name = "ENGINE_ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Print the generated command without running it
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Show the pattern, arguments and the model's explanation
    #[arg(long)]
    pub explain: bool,

    /// Interactively create the configuration file
    #[arg(long)]
    pub init: bool,

    /// Show the current configuration (API keys masked)
    #[arg(long)]
    pub config: bool,

    /// Show the first N matching lines before running (default 3)
    #[arg(
        long,
        value_name = "N",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "3"
    )]
    pub preview: Option<usize>,

    /// Search engine to use
    #[arg(long, value_name = "ENGINE", value_parser = parse_engine)]
    pub engine: Option<EnginePreference>,

    /// Use the query as the pattern, never asking the model
    #[arg(long)]
    pub literal: bool,

    /// Show debug logging
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors
    #[arg(long)]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color")]
    pub no_color: bool,
}

fn parse_engine(raw: &str) -> Result<EnginePreference, String> {
    EnginePreference::parse(raw)
        .ok_or_else(|| format!("invalid value '{raw}' (expected auto, rg or grep)"))
}

/// Raw arguments separated into derp's options and the engine's share.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SplitArgs {
    /// derp's own options, in order.
    pub derp: Vec<String>,
    /// The query followed by engine arguments, in order.
    pub rest: Vec<String>,
}

/// Separate derp's long options from the query and engine arguments.
///
/// A `--` before the query ends option recognition and is dropped; a `--`
/// after the query also ends it but is forwarded to the engine.
pub fn split_args<I, S>(args: I) -> SplitArgs
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut split = SplitArgs::default();
    let mut iter = args.into_iter().map(Into::into);

    while let Some(arg) = iter.next() {
        if arg == "--" {
            if !split.rest.is_empty() {
                split.rest.push(arg);
            }
            split.rest.extend(iter.by_ref());
            break;
        }

        let name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        if arg == "-h" || DERP_SWITCHES.contains(&name) {
            split.derp.push(arg);
        } else if DERP_VALUE_OPTIONS.contains(&name) {
            let needs_value = !arg.contains('=');
            split.derp.push(arg);
            if needs_value {
                split.derp.extend(iter.next());
            }
        } else {
            split.rest.push(arg);
        }
    }

    split
}

impl Cli {
    /// Parse a full argument list (program name first).
    ///
    /// # Errors
    ///
    /// Returns clap's error for invalid options, and for `--help` and
    /// `--version`, which clap reports as errors carrying exit code 0.
    pub fn try_parse_split<I, S>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let mut args = args.into_iter().map(|arg| {
            let os: OsString = arg.into();
            os.to_string_lossy().into_owned()
        });
        let program = args.next().unwrap_or_else(|| "derp".to_string());
        let split = split_args(args);

        let argv = std::iter::once(program)
            .chain(split.derp)
            .chain(std::iter::once("--".to_string()))
            .chain(split.rest);
        Self::try_parse_from(argv)
    }

    /// Whether the command line was empty: no query and no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
