//! Prompt construction for pattern generation.

const REGEX_SYSTEM_PROMPT: &str = include_str!("prompts/regex.system.txt");

/// The two prompt strings handed to a completion backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    /// Instructions and reference patterns.
    pub system: String,
    /// The user's request.
    pub user: String,
}

/// Prompts asking for a JSON `{regex, args, explanation}` object for `intent`.
#[must_use]
pub fn regex_prompt(intent: &str) -> PromptPair {
    PromptPair {
        system: REGEX_SYSTEM_PROMPT.trim().to_string(),
        user: format!("Generate regex for: {}", intent.trim()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::completion::parse_completion;

    #[test]
    fn test_user_prompt_carries_intent() {
        let prompt = regex_prompt("  emails in files ");
        assert_eq!(prompt.user, "Generate regex for: emails in files");
    }

    #[test]
    fn test_system_prompt_asks_for_json() {
        let prompt = regex_prompt("anything");
        assert!(prompt.system.contains("\"regex\""));
        assert!(prompt.system.contains("\"args\""));
        assert!(prompt.system.contains("\"explanation\""));
        assert!(prompt.system.contains("Never put \"-E\" or \"-e\""));
    }

    #[test]
    fn test_reference_email_pattern_survives_the_parser() {
        // The canonical email answer parses back to the documented pattern.
        let pattern = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
        assert!(regex_prompt("emails").system.contains(pattern));

        let raw = serde_json::json!({"regex": pattern, "args": ["-r"]}).to_string();
        let result = parse_completion(&raw).unwrap();
        assert_eq!(result.pattern(), pattern);
    }
}
