//! Natural-language query to pattern, end to end.

use crate::completion::{CompletionResult, parse_completion};
use crate::prompt::regex_prompt;
use crate::provider::CompletionBackend;
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, instrument};

/// Ask `backend` for a pattern matching `query` and parse the answer.
///
/// # Errors
///
/// - [`Error::Timeout`] if the backend does not answer within `timeout`
/// - whatever the backend returns on failure (normally [`Error::Provider`])
/// - [`Error::EmptyPattern`] if the answer is blank
#[instrument(level = "debug", skip(backend), fields(provider = backend.name()))]
pub async fn translate(
    query: &str,
    backend: &dyn CompletionBackend,
    timeout: Duration,
) -> Result<CompletionResult> {
    let prompt = regex_prompt(query);

    let raw = tokio::time::timeout(timeout, backend.complete(&prompt.system, &prompt.user))
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "{} did not answer within {}s",
                backend.name(),
                timeout.as_secs()
            ))
        })??;

    debug!(raw = %raw, "model answered");
    parse_completion(&raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend returning a canned answer and recording the prompts it saw.
    struct CannedBackend {
        answer: std::result::Result<String, String>,
        delay: Duration,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl CannedBackend {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                answer: Err(message.to_string()),
                ..Self::answering("")
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::answering("{\"regex\": \"late\"}")
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        fn name(&self) -> &str {
            "Canned"
        }

        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer
                .clone()
                .map_err(|message| Error::provider("Canned", message))
        }
    }

    #[tokio::test]
    async fn test_email_query_round_trip() {
        // Given: A model that answers with the canonical email pattern
        let backend = CannedBackend::answering(
            r#"{"regex": "[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\\.[a-zA-Z]{2,}", "args": ["-r"]}"#,
        );

        // When: Translating
        let result = translate("emails in files", &backend, Duration::from_secs(5))
            .await
            .unwrap();

        // Then: The prompt carried the query and the answer was parsed
        assert_eq!(result.pattern(), r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}");
        assert_eq!(result.arguments(), ["-r"]);
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "Generate regex for: emails in files");
    }

    #[tokio::test]
    async fn test_backend_failure_is_passed_through() {
        let backend = CannedBackend::failing("HTTP 401");

        let err = translate("x", &backend, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "provider");
        assert!(err.to_string().contains("HTTP 401"));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let backend = CannedBackend::slow(Duration::from_secs(10));

        let err = translate("x", &backend, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert!(err.to_string().contains("Canned"));
    }

    #[tokio::test]
    async fn test_blank_answer_is_empty_pattern() {
        let backend = CannedBackend::answering("  \n ");

        let err = translate("x", &backend, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyPattern));
    }

    #[tokio::test]
    async fn test_prose_answer_degrades_gracefully() {
        let backend = CannedBackend::answering("regex: `TODO|FIXME`\n\nMatches markers.");

        let result = translate("todo markers", &backend, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.pattern(), "TODO|FIXME");
        assert!(result.arguments().is_empty());
        assert!(result.explanation().unwrap().contains("Matches markers."));
    }
}
