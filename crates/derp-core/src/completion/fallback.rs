//! Pattern mining for completions that are not usable JSON.
//!
//! Each step is a pure function so it can be tested on its own;
//! [`mine_pattern`] chains them.

use regex::Regex;
use std::sync::OnceLock;

/// Top-level domain appended to email patterns that lost theirs.
const EMAIL_TLD: &str = r"\.[A-Za-z]{2,}";

/// Best-effort pattern from free text. Returns an empty string only for
/// blank input.
#[must_use]
pub fn mine_pattern(raw: &str) -> String {
    let trimmed = raw.trim();

    let candidate = first_code_block(trimmed)
        .filter(|block| !block.is_empty())
        .map_or_else(|| first_paragraph(trimmed), str::to_string);

    let candidate = strip_label(&candidate);
    let candidate = strip_quotes(candidate);
    let candidate = strip_whitespace(candidate);
    let candidate = repair_email_pattern(&candidate);

    if candidate.is_empty() {
        trimmed.lines().next().unwrap_or_default().trim().to_string()
    } else {
        candidate
    }
}

/// Trimmed body of the first fenced block whose info string is not `json`.
#[must_use]
pub fn first_code_block(text: &str) -> Option<&str> {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = BLOCK
        .get_or_init(|| Regex::new(r"(?s)```([^\n]*)\n(.*?)```").expect("code block regex is valid"));

    re.captures_iter(text)
        .find(|caps| {
            !caps[1]
                .trim_start()
                .get(..4)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
        })
        .and_then(|caps| caps.get(2))
        .map(|body| body.as_str().trim())
}

/// First blank-line separated paragraph, with its line breaks turned into spaces.
#[must_use]
pub fn first_paragraph(text: &str) -> String {
    static PARAGRAPH_BREAK: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = PARAGRAPH_BREAK
        .get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph regex is valid"));

    let paragraph = re.split(text).next().unwrap_or_default();
    paragraph.lines().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Drop a leading `regex:` / `pattern =` / `Regex -` label.
#[must_use]
pub fn strip_label(text: &str) -> &str {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = LABEL.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:regex|pattern)\s*[:=\-]\s*").expect("label regex is valid")
    });

    re.find(text).map_or(text, |label| &text[label.end()..])
}

/// Drop one quote or backtick from each end, independently.
#[must_use]
pub fn strip_quotes(text: &str) -> &str {
    const QUOTES: &[char] = &['"', '\'', '`'];
    let text = text.strip_prefix(QUOTES).unwrap_or(text);
    text.strip_suffix(QUOTES).unwrap_or(text)
}

/// Remove all whitespace; engine patterns are single-line.
#[must_use]
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Patch the two ways email patterns usually come back truncated.
///
/// A bracket class right after `@` without a quantifier gets `+`, and a
/// pattern with no escaped dot after the `@` gets a top-level domain.
/// Text without `@` is returned unchanged.
#[must_use]
pub fn repair_email_pattern(pattern: &str) -> String {
    static DOMAIN_CLASS: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = DOMAIN_CLASS
        .get_or_init(|| Regex::new(r"@\[[^\]]+\]").expect("domain class regex is valid"));

    let Some(at) = pattern.find('@') else {
        return pattern.to_string();
    };

    let mut repaired = String::with_capacity(pattern.len() + EMAIL_TLD.len() + 2);
    let mut last = 0;
    for class in re.find_iter(pattern) {
        repaired.push_str(&pattern[last..class.end()]);
        let quantified = pattern[class.end()..].starts_with(['+', '*', '{', '?']);
        if !quantified {
            repaired.push('+');
        }
        last = class.end();
    }
    repaired.push_str(&pattern[last..]);

    if !repaired[at..].contains(r"\.") {
        repaired.push_str(EMAIL_TLD);
    }
    repaired
}
