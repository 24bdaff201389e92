//! # derp-core
//!
//! Core functionality for derp, a natural-language front end for `grep` and
//! ripgrep.
//!
//! A query such as "emails in files" is sent to a language model, the free-form
//! answer is interpreted into a validated pattern plus extra engine arguments,
//! and the result is assembled into an argument vector that is spawned
//! directly, without a shell.
//!
//! ## Architecture
//!
//! - **Classification**: decide whether a query is prose or already a pattern
//! - **Translation**: prompt construction, provider backends, completion parsing
//! - **Assembly**: engine discovery, argument classification, wildcard
//!   expansion, the final [`SearchCommand`]
//! - **Configuration**: the persisted JSON config and its environment defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use derp_core::{
//!     ColorMode, Config, ProviderClient, SearchCommand, resolve_engine, translate,
//! };
//! use std::time::Duration;
//!
//! # async fn run() -> derp_core::Result<()> {
//! let config = Config::load();
//! let engine = resolve_engine(config.engine)?;
//! let backend = ProviderClient::from_config(&config)?;
//!
//! let result = translate("emails in files", &backend, Duration::from_secs(30)).await?;
//! let command = SearchCommand::assemble(&engine, result.pattern(), result.arguments(), &[], ColorMode::Always);
//! println!("{}", command.render());
//! let code = command.execute().await?;
//! # let _ = code;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Malformed model output is not an
//! error: the completion parser falls back to mining the text and only fails
//! when nothing at all is left.
//!
//! ```rust
//! use derp_core::{Error, parse_completion};
//!
//! match parse_completion("not-json-at-all") {
//!     Ok(result) => assert_eq!(result.pattern(), "not-json-at-all"),
//!     Err(Error::EmptyPattern) => unreachable!("input is not blank"),
//!     Err(e) => eprintln!("Unexpected error: {e}"),
//! }
//! ```

/// Classification of engine arguments into flags, flag values and operands
pub mod args;
/// Prose-or-pattern decision for user queries
pub mod classify;
/// Engine invocation: assembly, dry-run rendering, execution and preview
pub mod command;
/// Interpretation of raw model completions
pub mod completion;
/// Persisted configuration and provider selection
pub mod config;
/// Search engine discovery
pub mod engine;
/// Error types and result aliases
pub mod error;
/// Wildcard expansion of file operands
pub mod glob_expand;
/// Prompt construction
pub mod prompt;
/// Language-model backends
pub mod provider;
/// Shell quoting for display
pub mod quote;
/// Query to pattern via a backend
pub mod translate;

// Re-export commonly used types
pub use classify::{QueryKind, classify_query, is_probably_natural_language};
pub use command::{ColorMode, PreviewOptions, SearchCommand};
pub use completion::{CompletionResult, parse_completion};
pub use config::{Config, ProviderKind};
pub use engine::{EngineDescriptor, EngineKind, EnginePreference, resolve_engine};
pub use error::{Error, Result};
pub use prompt::{PromptPair, regex_prompt};
pub use provider::{CompletionBackend, ProviderClient};
pub use translate::translate;
