//! Search command assembly and execution.
//!
//! [`SearchCommand::assemble`] combines a pattern, the arguments proposed by
//! the model, the user's own engine arguments and the engine's defaults into
//! the final argument vector:
//!
//! ```text
//! grep: -E [-r] -e PATTERN [--color=WHEN] ARGS...
//! rg:         -e PATTERN [--color=WHEN] ARGS...
//! ```
//!
//! The pattern is always bound with `-e`, so a pattern that starts with `-`
//! cannot be mistaken for a flag. The process is spawned directly from the
//! vector; no shell is involved at any point.

use crate::args::{ArgRole, classify, is_color_flag, is_recursive_flag};
use crate::engine::EngineDescriptor;
use crate::glob_expand::expand_arguments;
use crate::quote::render_command;
use crate::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default number of lines shown by a preview.
pub const DEFAULT_PREVIEW_LINES: usize = 3;

/// Hard bound on a preview run.
pub const DEFAULT_PREVIEW_TIMEOUT: Duration = Duration::from_secs(5);

/// Most stdout bytes a preview will read.
pub const PREVIEW_MAX_BYTES: u64 = 1024 * 1024;

/// Color setting injected when the user did not pass one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// `--color=always`
    #[default]
    Always,
    /// `--color=never`
    Never,
}

impl ColorMode {
    const fn flag(self) -> &'static str {
        match self {
            Self::Always => "--color=always",
            Self::Never => "--color=never",
        }
    }
}

/// Options for [`SearchCommand::preview`].
#[derive(Debug, Clone, Copy)]
pub struct PreviewOptions {
    /// Number of non-blank lines to keep.
    pub limit: usize,
    /// Time after which the engine is killed.
    pub timeout: Duration,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PREVIEW_LINES,
            timeout: DEFAULT_PREVIEW_TIMEOUT,
        }
    }
}

impl PreviewOptions {
    /// Set the number of lines to keep.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A fully assembled engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCommand {
    engine: EngineDescriptor,
    pattern: String,
    recursive: bool,
    /// `None` when the user supplied their own color flag.
    color: Option<ColorMode>,
    args: Vec<String>,
}

impl SearchCommand {
    /// Build the invocation of `engine` for `pattern`.
    ///
    /// `model_args` come before `user_args` so the user's flags take
    /// precedence where the engine lets the last occurrence win. Flags the
    /// engine would misread are dropped and wildcard operands are expanded.
    pub fn assemble(
        engine: &EngineDescriptor,
        pattern: &str,
        model_args: &[String],
        user_args: &[String],
        color: ColorMode,
    ) -> Self {
        let kind = engine.kind();
        let combined: Vec<&String> = model_args
            .iter()
            .chain(user_args)
            .filter(|arg| {
                let foreign = kind.foreign_flags().contains(&arg.as_str());
                if foreign {
                    debug!(engine = %kind, flag = %arg, "dropping flag the engine does not understand");
                }
                !foreign
            })
            .collect();

        let args = expand_arguments(&combined);
        let roles = classify(&args);

        let has_files = roles.iter().any(|role| *role == ArgRole::Positional);
        let has_recursive = args
            .iter()
            .zip(&roles)
            .any(|(arg, role)| *role == ArgRole::Flag && is_recursive_flag(arg));
        let has_color = args
            .iter()
            .zip(&roles)
            .any(|(arg, role)| *role == ArgRole::Flag && is_color_flag(arg));

        Self {
            engine: engine.clone(),
            pattern: pattern.to_string(),
            recursive: !kind.recurses_by_default() && !has_recursive && !has_files,
            color: (!has_color).then_some(color),
            args,
        }
    }

    /// The engine this command runs.
    #[must_use]
    pub const fn engine(&self) -> &EngineDescriptor {
        &self.engine
    }

    /// The pattern token.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The complete argument vector, excluding the program itself.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let kind = self.engine.kind();
        let mut argv = Vec::with_capacity(self.args.len() + 5);
        argv.extend(kind.ere_flag().map(str::to_string));
        if self.recursive {
            argv.extend(kind.recursive_flag().map(str::to_string));
        }
        argv.push("-e".to_string());
        argv.push(self.pattern.clone());
        argv.extend(self.color.map(|mode| mode.flag().to_string()));
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// The command as one shell-pasteable line, for `--dry-run`.
    #[must_use]
    pub fn render(&self) -> String {
        render_command(self.engine.kind().binary_name(), &self.argv())
    }

    /// Run the engine with inherited stdio and return its exit code.
    ///
    /// Exit code 1 means "no matches" and is returned like any other code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if the process cannot be spawned.
    pub async fn execute(&self) -> Result<i32> {
        debug!(command = %self.render(), "executing search");
        let status = Command::new(self.engine.path())
            .args(self.argv())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| self.execution_error(source))?;

        Ok(exit_code(status))
    }

    /// Run the search quietly and return its first non-blank output lines.
    ///
    /// Output is uncolored, bounded by [`PREVIEW_MAX_BYTES`] and by the
    /// timeout. Every failure yields an empty list.
    pub async fn preview(&self, options: PreviewOptions) -> Vec<String> {
        let command = self.without_color();
        match tokio::time::timeout(options.timeout, command.capture_stdout()).await {
            Ok(Ok(stdout)) => String::from_utf8_lossy(&stdout)
                .lines()
                .filter(|line| !line.trim().is_empty())
                .take(options.limit)
                .map(str::to_string)
                .collect(),
            Ok(Err(err)) => {
                debug!(error = %err, "preview failed");
                Vec::new()
            },
            Err(_) => {
                warn!(
                    "Preview timed out after {}s",
                    options.timeout.as_secs_f32()
                );
                Vec::new()
            },
        }
    }

    fn without_color(&self) -> Self {
        let roles = classify(&self.args);
        let args = self
            .args
            .iter()
            .zip(roles)
            .filter(|(arg, role)| !(*role == ArgRole::Flag && is_color_flag(arg)))
            .map(|(arg, _)| arg.clone())
            .collect();
        Self {
            color: Some(ColorMode::Never),
            args,
            ..self.clone()
        }
    }

    async fn capture_stdout(&self) -> Result<Vec<u8>> {
        let mut child = Command::new(self.engine.path())
            .args(self.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.execution_error(source))?;

        let mut buffer = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            stdout.take(PREVIEW_MAX_BYTES).read_to_end(&mut buffer).await?;
        }
        // Output beyond the cap is discarded; the child is killed on drop.
        Ok(buffer)
    }

    fn execution_error(&self, source: std::io::Error) -> Error {
        Error::Execution {
            engine: self.engine.kind().to_string(),
            source,
        }
    }
}

/// Shell-style exit code: the process's own code, or 128 + signal on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
