//! Wildcard expansion of file operands.
//!
//! The engine is spawned without a shell, so `*.txt` would otherwise reach it
//! as a literal file name. Operands containing `*`, `?` or `[` are expanded
//! against the filesystem here, the way an interactive shell would.

use crate::args::{ArgRole, classify};
use glob::MatchOptions;
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Whether the token contains a wildcard character.
#[must_use]
pub fn has_wildcard(token: &str) -> bool {
    token.contains(['*', '?', '['])
}

/// Expand wildcard operands in place.
///
/// Flags and flag values are passed through untouched. An operand whose
/// pattern is invalid, or which matches nothing, is kept literally so the
/// engine can report the missing file itself.
pub fn expand_arguments<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let roles = classify(args);
    let mut expanded = Vec::with_capacity(args.len());

    for (arg, role) in args.iter().zip(roles) {
        let arg = arg.as_ref();
        if role == ArgRole::Positional && has_wildcard(arg) {
            expanded.extend(expand_token(arg));
        } else {
            expanded.push(arg.to_string());
        }
    }

    expanded
}

/// Expand one pattern into its matches, or keep it as-is.
#[must_use]
pub fn expand_token(pattern: &str) -> Vec<String> {
    let paths = match glob::glob_with(pattern, MATCH_OPTIONS) {
        Ok(paths) => paths,
        Err(err) => {
            debug!(pattern, error = %err, "invalid wildcard pattern, passing through");
            return vec![pattern.to_string()];
        },
    };

    let matches: Vec<String> = paths
        .filter_map(std::result::Result::ok)
        .map(|path| path.to_string_lossy().into_owned())
        .collect();

    if matches.is_empty() {
        debug!(pattern, "wildcard matched nothing, passing through");
        return vec![pattern.to_string()];
    }

    debug!(pattern, count = matches.len(), "expanded wildcard");
    matches
}
