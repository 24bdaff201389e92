//! Interactive configuration wizard (`derp --init`).

use anyhow::{Context, Result};
use colored::Colorize;
use derp_core::{Config, ProviderClient, ProviderKind};
use inquire::error::InquireError;
use inquire::{Password, PasswordDisplayMode, Select, Text};
use is_terminal::IsTerminal;
use std::fmt;

use crate::error::CliError;

/// Select-list entry wrapping a provider with its display name.
#[derive(Clone, Copy)]
struct ProviderChoice(ProviderKind);

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.display_name(), self.0.as_str())
    }
}

/// Run the wizard and save the result.
///
/// The stored configuration seeds every default, so re-running the wizard
/// and pressing enter throughout keeps what was there. Values that only exist
/// in the environment are used for validation but never saved.
///
/// # Errors
///
/// Fails outside an interactive terminal, when the answers do not form a
/// usable provider configuration, or when the file cannot be written.
pub fn run() -> Result<()> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::usage("`derp --init` needs an interactive terminal").into());
    }

    println!("{}\n", "Configuration Setup".bold());

    // Start from the file alone so environment-only keys are never saved.
    let current = Config::load_stored();
    let config = match prompt(current) {
        Ok(config) => config,
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            println!("{}", "Setup cancelled; nothing saved.".yellow());
            return Ok(());
        },
        Err(err) => return Err(err).context("Configuration prompt failed"),
    };

    // Building the client checks URLs and required keys without a request;
    // keys supplied by the environment count without being written.
    ProviderClient::from_config(
        &config
            .clone()
            .with_env_fallback(|key| std::env::var(key).ok()),
    )?;

    let path = config.save()?;
    println!("{} Configuration saved to {}", "✓".green(), path.display());
    Ok(())
}

fn prompt(mut config: Config) -> Result<Config, InquireError> {
    let choices: Vec<ProviderChoice> = ProviderKind::ALL.into_iter().map(ProviderChoice).collect();
    let cursor = ProviderKind::ALL
        .iter()
        .position(|kind| *kind == config.provider)
        .unwrap_or_default();

    let ProviderChoice(provider) = Select::new("Select LLM provider:", choices)
        .with_starting_cursor(cursor)
        .prompt()?;

    let model_default = config
        .model
        .clone()
        .filter(|_| provider == config.provider)
        .unwrap_or_else(|| provider.default_model().to_string());
    let model = Text::new("Model name:").with_default(&model_default).prompt()?;

    config.provider = provider;
    config.model = Some(model.trim().to_string()).filter(|m| !m.is_empty());

    match provider {
        ProviderKind::Ollama => {
            config.ollama_host = Some(text_with_default(
                "Ollama host:",
                config.ollama_host.as_deref(),
            )?);
        },
        ProviderKind::LmStudio => {
            config.lmstudio_url = Some(text_with_default(
                "LM Studio URL:",
                config.lmstudio_url.as_deref(),
            )?);
        },
        ProviderKind::OpenAi => {
            config.openai_api_key = secret("OpenAI API key:", config.openai_api_key.take())?;
        },
        ProviderKind::Bedrock => {
            config.bedrock_url = Some(text_with_default(
                "Bedrock URL:",
                config.bedrock_url.as_deref(),
            )?)
            .filter(|url| !url.is_empty());
        },
        ProviderKind::OpenRouter => {
            config.openrouter_api_key =
                secret("OpenRouter API key:", config.openrouter_api_key.take())?;
        },
    }

    Ok(config)
}

fn text_with_default(message: &str, default: Option<&str>) -> Result<String, InquireError> {
    let mut text = Text::new(message);
    if let Some(default) = default {
        text = text.with_default(default);
    }
    Ok(text.prompt()?.trim().to_string())
}

/// Ask for a secret; an empty answer keeps the existing one.
fn secret(message: &str, existing: Option<String>) -> Result<Option<String>, InquireError> {
    let help = if existing.is_some() {
        "Leave empty to keep the current key"
    } else {
        "Input is hidden"
    };
    let answer = Password::new(message)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message(help)
        .prompt()?;

    let answer = answer.trim().to_string();
    Ok(if answer.is_empty() { existing } else { Some(answer) })
}
