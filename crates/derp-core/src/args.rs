//! Classification of engine arguments.
//!
//! The assembler needs to know which user tokens are file operands (they get
//! glob-expanded and suppress the recursive default) and which are flags or
//! flag values. Only the flags common to grep and ripgrep are known here;
//! anything else starting with `-` is treated as a plain switch.

/// Role of one token in an engine argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRole {
    /// A switch such as `-i` or `--include=*.rs`.
    Flag,
    /// The separate value of the preceding flag (`5` in `-m 5`).
    FlagValue,
    /// A file or directory operand.
    Positional,
}

/// Short flags that consume a value (grep and ripgrep).
const SHORT_VALUE_FLAGS: &[char] = &['A', 'B', 'C', 'm', 'f', 'e', 'd', 'D', 'g', 't', 'M', 'j'];

/// Long flags that consume the following token when written without `=`.
const LONG_VALUE_FLAGS: &[&str] = &[
    "--regexp",
    "--file",
    "--max-count",
    "--after-context",
    "--before-context",
    "--context",
    "--include",
    "--exclude",
    "--exclude-dir",
    "--exclude-from",
    "--label",
    "--directories",
    "--devices",
    "--glob",
    "--iglob",
    "--type",
    "--type-not",
    "--type-add",
    "--max-depth",
    "--max-columns",
    "--threads",
    "--ignore-file",
];

const RECURSIVE_LONG_FLAGS: &[&str] = &["--recursive", "--dereference-recursive"];

/// Assign an [`ArgRole`] to every token, in order.
pub fn classify<S: AsRef<str>>(args: &[S]) -> Vec<ArgRole> {
    let mut roles = Vec::with_capacity(args.len());
    let mut expect_value = false;
    let mut operands_only = false;

    for arg in args {
        let arg = arg.as_ref();
        if operands_only {
            roles.push(ArgRole::Positional);
            continue;
        }
        if expect_value {
            roles.push(ArgRole::FlagValue);
            expect_value = false;
            continue;
        }
        if arg == "--" {
            roles.push(ArgRole::Flag);
            operands_only = true;
            continue;
        }
        if is_flag(arg) {
            roles.push(ArgRole::Flag);
            expect_value = consumes_next(arg);
            continue;
        }
        roles.push(ArgRole::Positional);
    }

    roles
}

/// Whether the token looks like a switch. A lone `-` is the stdin operand.
#[must_use]
pub fn is_flag(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

/// Whether the token asks the engine to recurse into directories.
///
/// Short clusters count too, so `-rn` and `-iR` are recursive.
#[must_use]
pub fn is_recursive_flag(arg: &str) -> bool {
    if RECURSIVE_LONG_FLAGS.contains(&arg) {
        return true;
    }
    short_cluster(arg).is_some_and(|cluster| {
        cluster
            .chars()
            .take_while(|c| !SHORT_VALUE_FLAGS.contains(c))
            .any(|c| c == 'r' || c == 'R')
    })
}

/// Whether the token controls colored output.
#[must_use]
pub fn is_color_flag(arg: &str) -> bool {
    arg.starts_with("--color") || arg.starts_with("--colour")
}

fn consumes_next(arg: &str) -> bool {
    if arg.starts_with("--") {
        return LONG_VALUE_FLAGS.contains(&arg);
    }
    short_cluster(arg).is_some_and(|cluster| {
        // The first value-taking letter swallows the rest of the cluster; it
        // only needs the next token when it is the last letter.
        cluster
            .char_indices()
            .find(|(_, c)| SHORT_VALUE_FLAGS.contains(c))
            .is_some_and(|(idx, c)| idx + c.len_utf8() == cluster.len())
    })
}

fn short_cluster(arg: &str) -> Option<&str> {
    arg.strip_prefix('-')
        .filter(|rest| !rest.is_empty() && !rest.starts_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArgRole::{Flag, FlagValue, Positional};

    #[test]
    fn test_plain_operands_and_switches() {
        let roles = classify(&["-i", "src", "-n", "README.md"]);
        assert_eq!(roles, vec![Flag, Positional, Flag, Positional]);
    }

    #[test]
    fn test_value_flags_consume_next_token() {
        let roles = classify(&["-m", "5", "--include", "*.rs", "-A3", "lib"]);
        assert_eq!(
            roles,
            vec![Flag, FlagValue, Flag, FlagValue, Flag, Positional]
        );
    }

    #[test]
    fn test_inline_values_do_not_consume() {
        let roles = classify(&["--include=*.rs", "-m5", "*.txt"]);
        assert_eq!(roles, vec![Flag, Flag, Positional]);
    }

    #[test]
    fn test_cluster_ending_in_value_flag() {
        let roles = classify(&["-im", "2", "notes"]);
        assert_eq!(roles, vec![Flag, FlagValue, Positional]);
    }

    #[test]
    fn test_double_dash_ends_options() {
        let roles = classify(&["--", "-weird-file", "x"]);
        assert_eq!(roles, vec![Flag, Positional, Positional]);
    }

    #[test]
    fn test_lone_dash_is_stdin_operand() {
        assert_eq!(classify(&["-"]), vec![Positional]);
    }

    #[test]
    fn test_recursive_detection() {
        for flag in ["-r", "-R", "--recursive", "--dereference-recursive", "-rn", "-iR"] {
            assert!(is_recursive_flag(flag), "{flag} should be recursive");
        }
        for flag in ["-i", "--regexp", "-m", "-er", "--color=always", "src"] {
            assert!(!is_recursive_flag(flag), "{flag} should not be recursive");
        }
    }

    #[test]
    fn test_color_detection() {
        assert!(is_color_flag("--color=never"));
        assert!(is_color_flag("--colour"));
        assert!(!is_color_flag("-c"));
    }
}
