//! Error types and handling for derp-core operations.
//!
//! Every fallible operation in the crate returns [`Result<T>`]. Errors are grouped
//! into categories that line up with how the CLI reports them:
//!
//! - **Configuration**: malformed persisted config, missing credentials or endpoints
//! - **Resolution**: no search engine binary could be found
//! - **Provider**: the language-model call failed, timed out, or produced nothing usable
//! - **Execution**: the engine binary could not be spawned
//!
//! Parse degradation (a model answering in prose instead of JSON) is *not* an error;
//! the completion parser recovers from it on its own and only escalates to
//! [`Error::EmptyPattern`] when no pattern text survives.
//!
//! ```rust
//! use derp_core::Error;
//!
//! let err = Error::EngineNotFound("neither rg nor grep found in PATH".into());
//! assert_eq!(err.category(), "resolution");
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for derp-core operations.
///
/// `Display` yields a one-line, user-facing message; `Debug` keeps the full
/// source chain for `--verbose` diagnostics.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading and writing the configuration file and filesystem access
    /// during glob expansion.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed before a response could be interpreted.
    ///
    /// The underlying `reqwest::Error` is preserved so connection and timeout
    /// failures can be told apart.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration is invalid or incomplete.
    ///
    /// ## Common Causes
    ///
    /// - API key missing for a hosted provider
    /// - Endpoint URL that does not parse
    /// - Config file that cannot be written during `--init`
    #[error("Configuration error: {0}")]
    Config(String),

    /// The language-model backend failed.
    ///
    /// Network errors, non-2xx responses and malformed provider envelopes are all
    /// folded into this variant so callers see one uniform failure mode.
    #[error("{provider} API error: {message}")]
    Provider {
        /// Display name of the backend (e.g. `Ollama`).
        provider: String,
        /// Proximate cause.
        message: String,
    },

    /// The model answered, but no usable pattern could be recovered from it.
    #[error("Model returned no usable pattern")]
    EmptyPattern,

    /// No search engine binary could be located.
    #[error("Engine not found: {0}")]
    EngineNotFound(String),

    /// The engine binary was found but could not be started.
    ///
    /// Distinct from the engine running and finding nothing (exit code 1), which
    /// is not an error at all.
    #[error("Failed to execute {engine}: {source}")]
    Execution {
        /// Engine that failed to spawn.
        engine: String,
        /// Spawn failure reported by the OS.
        #[source]
        source: std::io::Error,
    },

    /// Operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Build a provider error for the named backend.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Check if the error might go away if the user simply re-runs the command.
    ///
    /// derp never retries on its own; this only drives the hint printed next to
    /// the error message.
    ///
    /// ```rust
    /// use derp_core::Error;
    ///
    /// assert!(Error::Timeout("model call".into()).is_recoverable());
    /// assert!(!Error::EmptyPattern.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// - `"io"`, `"network"`, `"config"`, `"provider"`, `"resolution"`,
    ///   `"execution"`, `"timeout"`, `"serialization"`, `"other"`
    ///
    /// [`Error::EmptyPattern`] reports as `"provider"`: from the user's point of
    /// view the model failed to answer.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Config(_) => "config",
            Self::Provider { .. } | Self::EmptyPattern => "provider",
            Self::EngineNotFound(_) => "resolution",
            Self::Execution { .. } => "execution",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
