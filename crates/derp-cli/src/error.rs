//! CLI error handling with semantic exit codes.
//!
//! When the search engine runs, derp exits with the engine's own status, so
//! `0` means matches and `1` means none. Failures before or instead of the
//! engine run map to these codes:
//!
//! | Code | Category | Description |
//! |------|----------|-------------|
//! | 1 | `Internal` | Unexpected/internal error |
//! | 1 | `Config` | Missing credentials, bad endpoint, unwritable config |
//! | 1 | `Provider` | Model request failed or produced no pattern |
//! | 1 | `Timeout` | Model did not answer in time |
//! | 2 | `Usage` | Invalid arguments |
//! | 126 | `NotExecutable` | Engine found but could not be started |
//! | 127 | `EngineNotFound` | Neither `rg` nor `grep` on `PATH` |
//!
//! # Usage
//!
//! ```bash
//! derp "emails in files"
//! case $? in
//!     0) echo "Matches" ;;
//!     1) echo "No matches (or derp failed; see stderr)" ;;
//!     127) echo "Install ripgrep or grep" ;;
//! esac
//! ```

use std::fmt;
use std::process::ExitCode;

/// Semantic error category determining the exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unexpected or internal error.
    Internal,

    /// Invalid arguments.
    Usage,

    /// Configuration is incomplete or could not be written.
    Config,

    /// The language model failed or returned nothing usable.
    Provider,

    /// The language model did not answer in time.
    Timeout,

    /// The engine exists but could not be spawned.
    NotExecutable,

    /// No search engine could be found.
    EngineNotFound,
}

impl ErrorCategory {
    /// Get the exit code for this category.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Internal | Self::Config | Self::Provider | Self::Timeout => 1,
            Self::Usage => 2,
            Self::NotExecutable => 126,
            Self::EngineNotFound => 127,
        }
    }

    /// Create an `ExitCode` from this category.
    #[must_use]
    pub fn as_exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_code())
    }

    /// Get a short description of this error category.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Internal => "internal error",
            Self::Usage => "usage error",
            Self::Config => "configuration error",
            Self::Provider => "provider error",
            Self::Timeout => "timeout",
            Self::NotExecutable => "engine not executable",
            Self::EngineNotFound => "engine not found",
        }
    }

    /// Category for an error raised by `derp-core`.
    #[must_use]
    pub const fn from_core(err: &derp_core::Error) -> Self {
        use derp_core::Error;
        match err {
            Error::Config(_) => Self::Config,
            Error::Provider { .. } | Error::EmptyPattern | Error::Network(_) => Self::Provider,
            Error::Timeout(_) => Self::Timeout,
            Error::EngineNotFound(_) => Self::EngineNotFound,
            Error::Execution { .. } => Self::NotExecutable,
            Error::Io(_) | Error::Serialization(_) | Error::Other(_) => Self::Internal,
        }
    }

    /// Infer the error category from an error message.
    ///
    /// Fallback for errors that are neither a [`CliError`] nor a
    /// `derp_core::Error`.
    #[must_use]
    pub fn infer_from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            return Self::Timeout;
        }

        if msg_lower.contains("engine not found") || msg_lower.contains("not found in path") {
            return Self::EngineNotFound;
        }

        if msg_lower.contains("api error") || msg_lower.contains("no usable pattern") {
            return Self::Provider;
        }

        if msg_lower.contains("configuration") || msg_lower.contains("not configured") {
            return Self::Config;
        }

        if msg_lower.contains("invalid argument")
            || msg_lower.contains("missing required")
            || msg_lower.contains("invalid value")
            || msg_lower.contains("unknown flag")
        {
            return Self::Usage;
        }

        Self::Internal
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A CLI error with a semantic category for exit code mapping.
///
/// ```rust,ignore
/// use derp_cli::error::{CliError, ErrorCategory};
/// use anyhow::anyhow;
///
/// let err = CliError::new(ErrorCategory::Usage, anyhow!("missing query"));
/// let err = CliError::usage("--preview expects a number");
/// ```
#[derive(Debug)]
pub struct CliError {
    /// The semantic category of this error.
    pub category: ErrorCategory,
    /// The underlying error with full context.
    pub source: anyhow::Error,
}

impl CliError {
    /// Create a new CLI error with explicit category.
    pub fn new(category: ErrorCategory, source: impl Into<anyhow::Error>) -> Self {
        Self {
            category,
            source: source.into(),
        }
    }

    /// Create a CLI error, inferring the category.
    pub fn inferred(source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        let category = categorize(&source);
        Self { category, source }
    }

    /// Create a usage error from a message.
    pub fn usage(message: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::Usage, anyhow::anyhow!("{message}"))
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.category.exit_code()
    }

    /// Create an `ExitCode` from this error.
    #[must_use]
    pub fn as_exit_code(&self) -> ExitCode {
        self.category.as_exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Extension trait for converting errors to `CliError`.
pub trait IntoCliError {
    /// Convert to a `CliError`, inferring the category.
    fn into_cli_error(self) -> CliError;

    /// Convert to a `CliError` with an explicit category.
    fn with_category(self, category: ErrorCategory) -> CliError;
}

impl<E: Into<anyhow::Error>> IntoCliError for E {
    fn into_cli_error(self) -> CliError {
        CliError::inferred(self)
    }

    fn with_category(self, category: ErrorCategory) -> CliError {
        CliError::new(category, self)
    }
}

/// Category of any error reaching the top level.
///
/// An explicit [`CliError`] wins, then a `derp_core::Error` anywhere in the
/// chain, then the message heuristics.
#[must_use]
pub fn categorize(err: &anyhow::Error) -> ErrorCategory {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.category;
    }
    if let Some(core_err) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<derp_core::Error>())
    {
        return ErrorCategory::from_core(core_err);
    }
    ErrorCategory::infer_from_message(&err.to_string())
}

/// Determine the exit code from an `anyhow::Error`.
#[must_use]
pub fn exit_code_from_error(err: &anyhow::Error) -> u8 {
    categorize(err).exit_code()
}
