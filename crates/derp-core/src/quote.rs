//! Shell quoting for command previews.
//!
//! The engine is always spawned with an argument vector, never through a
//! shell, so quoting here only affects what the user sees (and can paste).
//! Tokens made only of shell-safe characters are shown as-is.

use std::borrow::Cow;

/// Quote a single token for display in a POSIX shell.
pub fn quote(arg: &str) -> Cow<'_, str> {
    // shlex refuses NUL bytes; those cannot reach argv anyway, so fall back
    // to plain single-quoting for display.
    shlex::try_quote(arg).unwrap_or_else(|_| Cow::Owned(single_quote(arg)))
}

/// Render a program and its arguments as one shell-pasteable line.
pub fn render_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(quote(program))
        .chain(args.iter().map(|arg| quote(arg.as_ref())))
        .collect::<Vec<_>>()
        .join(" ")
}

fn single_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
