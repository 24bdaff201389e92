//! Interpretation of raw model completions.
//!
//! Language models are asked for a JSON object, but what comes back ranges
//! from exactly that, through JSON wrapped in Markdown fences or chatter, to
//! a bare pattern or a paragraph of prose. [`parse_completion`] turns any of
//! these into a [`CompletionResult`]:
//!
//! 1. A fenced block (tagged `json` or untagged) holding an object is
//!    unwrapped; otherwise the trimmed text is the candidate.
//! 2. The candidate is parsed as a JSON object, or failing that the first
//!    object embedded in it. The object must carry a non-empty `regex` (or
//!    `pattern`) string.
//! 3. If no object qualifies, the pattern is mined out of the text by the
//!    pure heuristics in [`fallback`]. This never fails unless the input is
//!    blank.
//!
//! ```rust
//! use derp_core::parse_completion;
//!
//! let result = parse_completion("```json\n{\"regex\": \"TODO\", \"args\": [\"-E\", \"-i\"]}\n```")?;
//! assert_eq!(result.pattern(), "TODO");
//! assert_eq!(result.arguments(), ["-i"]);
//! # Ok::<(), derp_core::Error>(())
//! ```

pub mod fallback;

use crate::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Flags the engine invocation always supplies itself.
const RESERVED_FLAGS: &[&str] = &["-E", "-e"];

/// A validated pattern plus the extra engine arguments proposed with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pattern: String,
    arguments: Vec<String>,
    explanation: Option<String>,
}

impl CompletionResult {
    /// Build a result, dropping reserved flags from `arguments`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] if `pattern` is empty.
    pub fn new(
        pattern: impl Into<String>,
        arguments: Vec<String>,
        explanation: Option<String>,
    ) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(Error::EmptyPattern);
        }
        Ok(Self {
            pattern,
            arguments: sanitize_arguments(arguments),
            explanation: explanation.filter(|text| !text.is_empty()),
        })
    }

    /// The pattern to search for.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Extra engine arguments, in the order the model gave them.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Free-text explanation, if the model offered one.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

/// Remove every reserved flag, keeping the order of the rest.
#[must_use]
pub fn sanitize_arguments(arguments: Vec<String>) -> Vec<String> {
    arguments
        .into_iter()
        .filter(|arg| !RESERVED_FLAGS.contains(&arg.as_str()))
        .collect()
}

/// Turn a raw completion into a [`CompletionResult`].
///
/// # Errors
///
/// Returns [`Error::EmptyPattern`] only when the completion is blank, so that
/// nothing at all could be recovered from it.
pub fn parse_completion(raw: &str) -> Result<CompletionResult> {
    let candidate = extract_fenced_json(raw).unwrap_or_else(|| raw.trim());

    match parse_object(candidate) {
        Ok(result) => {
            debug!(pattern = result.pattern(), "parsed structured completion");
            Ok(result)
        },
        Err(reason) => {
            warn!(reason, "Model response was not usable JSON, extracting pattern from text");
            let pattern = fallback::mine_pattern(raw);
            CompletionResult::new(pattern, Vec::new(), Some(raw.to_string()))
        },
    }
}

/// Interior of the first fenced block (tagged `json` or untagged) whose body
/// is a JSON object.
#[must_use]
pub fn extract_fenced_json(raw: &str) -> Option<&str> {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced json regex is valid")
    });
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn parse_object(candidate: &str) -> std::result::Result<CompletionResult, &'static str> {
    let value = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(_) => first_embedded_value(candidate).ok_or("no JSON object found")?,
    };
    let Value::Object(object) = value else {
        return Err("JSON is not an object");
    };
    from_object(object)
}

/// The first JSON value starting at the first `{`, ignoring whatever follows it.
fn first_embedded_value(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()
        .and_then(std::result::Result::ok)
}

fn from_object(mut object: Map<String, Value>) -> std::result::Result<CompletionResult, &'static str> {
    let pattern = match object.remove("regex").or_else(|| object.remove("pattern")) {
        Some(Value::String(pattern)) if !pattern.is_empty() => pattern,
        _ => return Err("missing or invalid \"regex\" field"),
    };

    let arguments = match object.remove("args").or_else(|| object.remove("arguments")) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(arg) => Some(arg),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let explanation = match object.remove("explanation") {
        Some(Value::String(text)) => Some(text),
        _ => None,
    };

    CompletionResult::new(pattern, arguments, explanation).map_err(|_| "empty pattern")
}
