//! Language-model backends.
//!
//! Every backend offers the same capability, [`CompletionBackend::complete`]:
//! given a system prompt and a user prompt, return the raw completion text.
//! [`ProviderClient`] implements it over HTTP for each [`ProviderKind`];
//! interpreting the text is left to [`crate::completion`].

use crate::config::{Config, DEFAULT_LMSTUDIO_URL, DEFAULT_OLLAMA_HOST, ProviderKind};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const LMSTUDIO_DUMMY_TOKEN: &str = "Bearer lm-studio";
const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 500;
/// How much of a failing response body is quoted in the error.
const ERROR_BODY_LIMIT: usize = 200;
/// Most bytes read from a failing response; enough for the quoted characters.
const ERROR_BODY_MAX_BYTES: usize = ERROR_BODY_LIMIT * 4 + 4;

/// Something that can turn a prompt pair into completion text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name, used in error messages.
    fn name(&self) -> &str;

    /// Request a completion.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// HTTP client for one configured backend.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    kind: ProviderKind,
    model: String,
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

impl ProviderClient {
    /// Build the client selected by `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the backend needs an API key or URL that
    /// is not configured, or when a configured URL does not parse. No request
    /// is made in that case.
    pub fn from_config(config: &Config) -> Result<Self> {
        let kind = config.provider;
        let (endpoint, api_key) = match kind {
            ProviderKind::Ollama => {
                let host = config.ollama_host.as_deref().unwrap_or(DEFAULT_OLLAMA_HOST);
                (join_endpoint(host, "api/chat")?, None)
            },
            ProviderKind::LmStudio => {
                let base = config.lmstudio_url.as_deref().unwrap_or(DEFAULT_LMSTUDIO_URL);
                (join_endpoint(base, "v1/chat/completions")?, None)
            },
            ProviderKind::OpenAi => (
                parse_url(OPENAI_CHAT_URL)?,
                Some(required(
                    config.openai_api_key.as_deref(),
                    "OpenAI API key not configured. Set OPENAI_API_KEY or run `derp --init`",
                )?),
            ),
            ProviderKind::Bedrock => {
                let url = required(
                    config.bedrock_url.as_deref(),
                    "Bedrock URL not configured. Set BEDROCK_URL or run `derp --init`",
                )?;
                (parse_url(&url)?, None)
            },
            ProviderKind::OpenRouter => (
                parse_url(OPENROUTER_CHAT_URL)?,
                Some(required(
                    config.openrouter_api_key.as_deref(),
                    "OpenRouter API key not configured. Set OPENROUTER_API_KEY or run `derp --init`",
                )?),
            ),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("derp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            kind,
            model: config.effective_model().to_string(),
            endpoint,
            api_key,
            client,
        })
    }

    /// Send requests to `endpoint` instead of the backend's usual URL.
    ///
    /// Used to point hosted backends at a local mock server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Backend in use.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Model requested from the backend.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// URL requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self, system: &str, user: &str) -> Value {
        let messages = json!([
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ]);
        match self.kind {
            ProviderKind::Ollama => json!({
                "model": self.model,
                "messages": messages,
                "stream": false,
                "options": { "temperature": TEMPERATURE },
            }),
            _ => json!({
                "model": self.model,
                "messages": messages,
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }),
        }
    }

    fn extract_content(&self, envelope: &Value) -> Option<String> {
        let content = match self.kind {
            ProviderKind::Ollama => envelope.pointer("/message/content"),
            ProviderKind::Bedrock => envelope
                .pointer("/choices/0/message/content")
                .or_else(|| envelope.pointer("/content/0/text")),
            _ => envelope.pointer("/choices/0/message/content"),
        };
        content.and_then(Value::as_str).map(str::to_string)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::provider(self.kind.display_name(), message)
    }
}

#[async_trait]
impl CompletionBackend for ProviderClient {
    fn name(&self) -> &str {
        self.kind.display_name()
    }

    #[instrument(level = "debug", skip_all, fields(provider = %self.kind, model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&self.request_body(system, user));

        match self.kind {
            ProviderKind::LmStudio => {
                request = request.header(AUTHORIZATION, LMSTUDIO_DUMMY_TOKEN);
            },
            ProviderKind::OpenRouter => {
                request = request
                    .header("HTTP-Referer", env!("CARGO_PKG_REPOSITORY"))
                    .header("X-Title", "derp");
            },
            _ => {},
        }
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(endpoint = %self.endpoint, "requesting completion");
        let response = request.send().await.map_err(|e| self.error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = read_prefix(response, ERROR_BODY_MAX_BYTES).await;
            return Err(self.error(format!("HTTP {status}: {}", truncate(body.trim()))));
        }
        let body = response.text().await.map_err(|e| self.error(e.to_string()))?;

        let envelope: Value = serde_json::from_str(&body)
            .map_err(|e| self.error(format!("invalid response body: {e}")))?;
        let content = self
            .extract_content(&envelope)
            .ok_or_else(|| self.error("response did not contain any completion text"))?;

        debug!(bytes = content.len(), "received completion");
        Ok(content)
    }
}

fn required(value: Option<&str>, message: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Config(message.to_string()))
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| Error::Config(format!("Invalid URL '{raw}': {e}")))
}

fn join_endpoint(base: &str, path: &str) -> Result<Url> {
    parse_url(&format!("{}/{path}", base.trim().trim_end_matches('/')))
}

/// Read at most `limit` bytes of the body; the rest is never buffered.
async fn read_prefix(mut response: reqwest::Response, limit: usize) -> String {
    let mut buffer = Vec::new();
    while buffer.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - buffer.len());
                buffer.extend_from_slice(&chunk[..take]);
            },
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "failed to read error body");
                break;
            },
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(provider: ProviderKind) -> Config {
        Config {
            provider,
            ..Config::from_env_with(|_| None)
        }
    }

    fn mock_url(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{route}", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_ollama_request_and_response() -> anyhow::Result<()> {
        // Given: An Ollama server that expects a non-streaming chat request
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:1.5b",
                "stream": false,
                "options": { "temperature": 0.1 },
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "usr" },
                ],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "role": "assistant", "content": "{\"regex\": \"x\"}" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::Ollama);
        config.ollama_host = Some(format!("{}/", server.uri()));

        // When: Completing
        let client = ProviderClient::from_config(&config)?;
        let content = client.complete("sys", "usr").await?;

        // Then: The message content is returned verbatim
        assert_eq!(content, "{\"regex\": \"x\"}");
        Ok(())
    }

    #[tokio::test]
    async fn test_lmstudio_sends_dummy_bearer() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", LMSTUDIO_DUMMY_TOKEN))
            .and(body_partial_json(json!({ "model": "local-model", "max_tokens": 500 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "abc" } }]
            })))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::LmStudio);
        config.lmstudio_url = Some(server.uri());

        let content = ProviderClient::from_config(&config)?.complete("s", "u").await?;
        assert_eq!(content, "abc");
        Ok(())
    }

    #[tokio::test]
    async fn test_openai_uses_api_key() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "ok" } }]
            })))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::OpenAi);
        config.openai_api_key = Some("sk-test".into());

        let client = ProviderClient::from_config(&config)?
            .with_endpoint(mock_url(&server, "/v1/chat/completions"));
        assert_eq!(client.complete("s", "u").await?, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_openrouter_sends_title_header() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-title", "derp"))
            .and(header("authorization", "Bearer or-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "routed" } }]
            })))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::OpenRouter);
        config.openrouter_api_key = Some("or-key".into());

        let client = ProviderClient::from_config(&config)?.with_endpoint(mock_url(&server, "/"));
        assert_eq!(client.model(), "anthropic/claude-3-sonnet");
        assert_eq!(client.complete("s", "u").await?, "routed");
        Ok(())
    }

    #[tokio::test]
    async fn test_bedrock_accepts_content_blocks() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invoke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "from-bedrock" }]
            })))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::Bedrock);
        config.bedrock_url = Some(format!("{}/invoke", server.uri()));

        let content = ProviderClient::from_config(&config)?.complete("s", "u").await?;
        assert_eq!(content, "from-bedrock");
        Ok(())
    }

    #[tokio::test]
    async fn test_http_error_names_backend_and_status() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::Ollama);
        config.ollama_host = Some(server.uri());

        let err = ProviderClient::from_config(&config)?
            .complete("s", "u")
            .await
            .unwrap_err();

        let message = err.to_string();
        assert_eq!(err.category(), "provider");
        assert!(message.starts_with("Ollama API error:"), "{message}");
        assert!(message.contains("500"), "{message}");
        assert!(message.contains("model not loaded"), "{message}");
        Ok(())
    }

    #[tokio::test]
    async fn test_large_error_body_is_cut_short() -> anyhow::Result<()> {
        // Given: A failing backend answering with a megabyte of text
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("x".repeat(1024 * 1024)))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::Ollama);
        config.ollama_host = Some(server.uri());

        // When: The request fails
        let err = ProviderClient::from_config(&config)?
            .complete("s", "u")
            .await
            .unwrap_err();

        // Then: Only the leading characters are quoted
        let message = err.to_string();
        assert!(message.contains("HTTP 502"), "{message}");
        assert!(message.ends_with('…'), "{message}");
        assert!(message.len() < ERROR_BODY_MAX_BYTES + 100, "{}", message.len());
        Ok(())
    }

    #[tokio::test]
    async fn test_read_prefix_stops_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("abcdefghij"))
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        assert_eq!(read_prefix(response, 4).await, "abcd");
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_provider_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let mut config = config_for(ProviderKind::LmStudio);
        config.lmstudio_url = Some(server.uri());

        let err = ProviderClient::from_config(&config)?
            .complete("s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "LM Studio"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_provider_error() {
        let mut config = config_for(ProviderKind::Ollama);
        config.ollama_host = Some("http://127.0.0.1:9".into());

        let err = ProviderClient::from_config(&config)
            .unwrap()
            .complete("s", "u")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "provider");
    }

    #[test]
    fn test_missing_credentials_fail_before_any_request() {
        for provider in [ProviderKind::OpenAi, ProviderKind::OpenRouter, ProviderKind::Bedrock] {
            let err = ProviderClient::from_config(&config_for(provider)).unwrap_err();
            assert_eq!(err.category(), "config", "{provider}");
        }
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let mut config = config_for(ProviderKind::OpenAi);
        config.openai_api_key = Some("   ".into());
        assert!(matches!(ProviderClient::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let mut config = config_for(ProviderKind::Ollama);
        config.ollama_host = Some("not a url".into());
        assert!(matches!(ProviderClient::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_endpoints() {
        let client = ProviderClient::from_config(&config_for(ProviderKind::Ollama)).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:11434/api/chat");
        assert_eq!(client.model(), "qwen2.5:1.5b");

        let client = ProviderClient::from_config(&config_for(ProviderKind::LmStudio)).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(500);
        let short = truncate(&long);
        assert!(short.chars().count() <= ERROR_BODY_LIMIT + 1);
        assert_eq!(truncate("brief"), "brief");
    }
}
