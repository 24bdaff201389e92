//! Configuration management for derp.
//!
//! Configuration is a single JSON object stored on disk. It is loaded once at
//! process start and passed by value to whatever needs it; nothing in the crate
//! reads it from ambient global state.
//!
//! ## Precedence
//!
//! 1. **On-disk value** (`$DERP_CONFIG`, or `~/.derp.json`)
//! 2. **Environment**: `OLLAMA_HOST`, `LMSTUDIO_URL`, `OPENAI_API_KEY`,
//!    `BEDROCK_URL`, `OPENROUTER_API_KEY`
//! 3. **Built-in defaults**
//!
//! ## Example Configuration File
//!
//! ```json
//! {
//!   "provider": "ollama",
//!   "model": "qwen2.5:1.5b",
//!   "ollamaHost": "http://localhost:11434",
//!   "engine": "auto",
//!   "timeoutSecs": 30
//! }
//! ```
//!
//! A malformed file is never fatal: it is reported with a warning and the
//! defaults are used instead.

use crate::engine::EnginePreference;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV: &str = "DERP_CONFIG";

/// File name used under the home directory when `DERP_CONFIG` is unset.
pub const CONFIG_FILENAME: &str = ".derp.json";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default LM Studio endpoint.
pub const DEFAULT_LMSTUDIO_URL: &str = "http://localhost:1234";

/// Default bound on a single model request, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Language-model backend selected by the `provider` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server (`/api/chat`).
    #[default]
    Ollama,
    /// Local LM Studio server (OpenAI-compatible).
    LmStudio,
    /// Hosted OpenAI chat completions.
    OpenAi,
    /// Bedrock behind an OpenAI-compatible gateway URL.
    Bedrock,
    /// Hosted OpenRouter chat completions.
    OpenRouter,
}

impl ProviderKind {
    /// Every supported backend, in the order the setup wizard lists them.
    pub const ALL: [Self; 5] = [
        Self::Ollama,
        Self::LmStudio,
        Self::OpenAi,
        Self::Bedrock,
        Self::OpenRouter,
    ];

    /// Tag used in the config file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::LmStudio => "lmstudio",
            Self::OpenAi => "openai",
            Self::Bedrock => "bedrock",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Human-readable backend name used in error messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::LmStudio => "LM Studio",
            Self::OpenAi => "OpenAI",
            Self::Bedrock => "Bedrock",
            Self::OpenRouter => "OpenRouter",
        }
    }

    /// Model used when the config does not name one.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Ollama => "qwen2.5:1.5b",
            Self::LmStudio => "local-model",
            Self::OpenAi => "gpt-4",
            Self::Bedrock => "anthropic.claude-v2",
            Self::OpenRouter => "anthropic/claude-3-sonnet",
        }
    }

    /// Parse a config tag, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == lowered)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend used for natural-language queries.
    pub provider: ProviderKind,

    /// Model name; falls back to [`ProviderKind::default_model`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ollama base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_host: Option<String>,

    /// LM Studio base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lmstudio_url: Option<String>,

    /// OpenAI API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Full chat-completions URL of the Bedrock gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrock_url: Option<String>,

    /// OpenRouter API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,

    /// Which search engine to drive.
    #[serde(default)]
    pub engine: EnginePreference,

    /// Bound on a single model request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Shape of the file on disk: every field optional so a partial file only
/// overrides what it names.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    provider: Option<ProviderKind>,
    model: Option<String>,
    ollama_host: Option<String>,
    lmstudio_url: Option<String>,
    openai_api_key: Option<String>,
    bedrock_url: Option<String>,
    openrouter_api_key: Option<String>,
    engine: Option<EnginePreference>,
    timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env_with(|_| None)
    }
}

impl Config {
    /// Built-in defaults seeded from the given environment lookup.
    ///
    /// Tests pass a closure instead of mutating the process environment.
    pub fn from_env_with<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        Self {
            provider: ProviderKind::Ollama,
            model: None,
            ollama_host: Some(var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.into())),
            lmstudio_url: Some(var("LMSTUDIO_URL").unwrap_or_else(|| DEFAULT_LMSTUDIO_URL.into())),
            openai_api_key: var("OPENAI_API_KEY"),
            bedrock_url: var("BEDROCK_URL"),
            openrouter_api_key: var("OPENROUTER_API_KEY"),
            engine: EnginePreference::Auto,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load the configuration from the default location using the process environment.
    ///
    /// Never fails: a missing file yields the defaults, an unreadable or
    /// malformed one yields the defaults plus a warning.
    pub fn load() -> Self {
        let env = |key: &str| std::env::var(key).ok();
        match config_path_with(env) {
            Ok(path) => Self::load_from(&path, env),
            Err(err) => {
                warn!("{err}; using default configuration");
                Self::from_env_with(env)
            },
        }
    }

    /// Load the configuration stored at `path`, layered over env-seeded defaults.
    pub fn load_from<F>(path: &Path, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::from_env_with(env);
        match read_config_file(path) {
            Ok(Some(file)) => {
                debug!("loaded configuration from {}", path.display());
                defaults.overlay(file)
            },
            Ok(None) => defaults,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
                defaults
            },
        }
    }

    /// Load only what is stored at the default location, ignoring the environment.
    ///
    /// Values that exist only in the environment stay out of the result, so
    /// saving it never copies them to disk.
    pub fn load_stored() -> Self {
        match config_path_with(|key| std::env::var(key).ok()) {
            Ok(path) => Self::stored_at(&path),
            Err(err) => {
                warn!("{err}; using default configuration");
                Self::default()
            },
        }
    }

    /// The file at `path` over built-in defaults, without environment values.
    pub fn stored_at(path: &Path) -> Self {
        Self::load_from(path, |_| None)
    }

    /// Fill missing credentials and endpoints from the environment.
    #[must_use]
    pub fn with_env_fallback<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let seeded = Self::from_env_with(env);
        self.openai_api_key = self.openai_api_key.or(seeded.openai_api_key);
        self.openrouter_api_key = self.openrouter_api_key.or(seeded.openrouter_api_key);
        self.bedrock_url = self.bedrock_url.or(seeded.bedrock_url);
        self
    }

    /// Save the configuration to the default location, returning the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path_with(|key| std::env::var(key).ok())?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save the configuration as pretty-printed JSON at `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }

    /// Model to request, falling back to the provider's default.
    #[must_use]
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Copy of the configuration with API keys masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.openai_api_key = copy.openai_api_key.as_deref().map(mask_secret);
        copy.openrouter_api_key = copy.openrouter_api_key.as_deref().map(mask_secret);
        copy
    }

    fn overlay(mut self, file: ConfigFile) -> Self {
        if let Some(provider) = file.provider {
            self.provider = provider;
        }
        if file.model.is_some() {
            self.model = file.model;
        }
        if file.ollama_host.is_some() {
            self.ollama_host = file.ollama_host;
        }
        if file.lmstudio_url.is_some() {
            self.lmstudio_url = file.lmstudio_url;
        }
        if file.openai_api_key.is_some() {
            self.openai_api_key = file.openai_api_key;
        }
        if file.bedrock_url.is_some() {
            self.bedrock_url = file.bedrock_url;
        }
        if file.openrouter_api_key.is_some() {
            self.openrouter_api_key = file.openrouter_api_key;
        }
        if let Some(engine) = file.engine {
            self.engine = engine;
        }
        if let Some(timeout) = file.timeout_secs.filter(|secs| *secs > 0) {
            self.timeout_secs = timeout;
        }
        self
    }
}

/// Location of the configuration file for the given environment.
///
/// `DERP_CONFIG` wins when set; otherwise `~/.derp.json`.
pub fn config_path_with<F>(env: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(explicit) = env(CONFIG_ENV) {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    let base = directories::BaseDirs::new()
        .ok_or_else(|| Error::Config("Failed to determine home directory".into()))?;
    Ok(base.home_dir().join(CONFIG_FILENAME))
}

fn read_config_file(path: &Path) -> Result<Option<ConfigFile>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::Config(format!("Failed to read config: {err}"))),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
}

fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::default();

        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.effective_model(), "qwen2.5:1.5b");
        assert_eq!(config.ollama_host.as_deref(), Some(DEFAULT_OLLAMA_HOST));
        assert_eq!(config.lmstudio_url.as_deref(), Some(DEFAULT_LMSTUDIO_URL));
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.engine, EnginePreference::Auto);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_seeds_defaults() {
        let env = env_from(&[
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("OPENAI_API_KEY", "sk-env"),
            ("BEDROCK_URL", "   "),
        ]);

        let config = Config::from_env_with(env);

        assert_eq!(config.ollama_host.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-env"));
        // Blank values count as unset
        assert!(config.bedrock_url.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json"), |_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_overrides_env_overrides_default() {
        // Given: env provides a host and a key; the file overrides only the key
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("derp.json");
        fs::write(
            &path,
            r#"{"provider":"openai","openaiApiKey":"sk-file","timeoutSecs":5}"#,
        )
        .unwrap();
        let env = env_from(&[("OPENAI_API_KEY", "sk-env"), ("OLLAMA_HOST", "http://env:1")]);

        // When
        let config = Config::load_from(&path, env);

        // Then
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.ollama_host.as_deref(), Some("http://env:1"));
        assert_eq!(config.effective_model(), "gpt-4");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("derp.json");
        fs::write(&path, "{ this is not json").unwrap();

        let config = Config::load_from(&path, |_| None);

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_provider_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("derp.json");
        fs::write(&path, r#"{"provider":"skynet"}"#).unwrap();

        let config = Config::load_from(&path, |_| None);

        assert_eq!(config.provider, ProviderKind::Ollama);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("derp.json");
        let config = Config {
            provider: ProviderKind::OpenRouter,
            model: Some("meta/llama".into()),
            openrouter_api_key: Some("or-key".into()),
            engine: EnginePreference::Grep,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path, |_| None);

        assert_eq!(loaded, config);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"openrouterApiKey\""));
        assert!(raw.contains("\"engine\": \"grep\""));
    }

    #[test]
    fn test_resaving_stored_config_keeps_env_secrets_off_disk() {
        // Given: A stored config and API keys that live only in the environment
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("derp.json");
        fs::write(&path, r#"{"provider":"openrouter","openrouterApiKey":"or-stored"}"#).unwrap();
        let env = env_from(&[
            ("OPENAI_API_KEY", "sk-from-env-secret"),
            ("OPENROUTER_API_KEY", "or-from-env-secret"),
        ]);

        // When: The stored layer is edited and written back
        let mut config = Config::stored_at(&path);
        config.provider = ProviderKind::Ollama;
        config.save_to(&path).unwrap();

        // Then: Stored values survive and environment values never reach the file
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("or-stored"), "{raw}");
        assert!(!raw.contains("from-env-secret"), "{raw}");

        // And: The environment still completes the config for validation
        let effective = Config::stored_at(&path).with_env_fallback(env);
        assert_eq!(effective.openai_api_key.as_deref(), Some("sk-from-env-secret"));
        assert_eq!(effective.openrouter_api_key.as_deref(), Some("or-stored"));
    }

    #[test]
    fn test_config_path_prefers_env_override() {
        let env = env_from(&[(CONFIG_ENV, "/tmp/custom-derp.json")]);
        let path = config_path_with(env).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom-derp.json"));
    }

    #[test]
    fn test_redacted_masks_keys() {
        let config = Config {
            openai_api_key: Some("sk-1234567890abcd".into()),
            openrouter_api_key: Some("short".into()),
            ..Config::default()
        };

        let redacted = config.redacted();

        assert_eq!(redacted.openai_api_key.as_deref(), Some("****abcd"));
        assert_eq!(redacted.openrouter_api_key.as_deref(), Some("****"));
        assert_eq!(redacted.ollama_host, config.ollama_host);
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("LMStudio"), Some(ProviderKind::LmStudio));
        assert_eq!(ProviderKind::parse(" openrouter "), Some(ProviderKind::OpenRouter));
        assert_eq!(ProviderKind::parse("azure"), None);
    }
}
