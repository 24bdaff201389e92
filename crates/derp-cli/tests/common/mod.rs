#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Create a `derp` command isolated from the user's configuration.
///
/// Each call gets a fresh config location; the directory is returned so the
/// caller can write a config file into it and keep it alive.
#[allow(dead_code)]
pub fn derp_cmd() -> (Command, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create config dir for tests");
    let cmd = derp_cmd_with_config(&dir.path().join("derp.json"));
    (cmd, dir)
}

/// Create a `derp` command reading its configuration from `config_path`.
#[allow(dead_code)]
pub fn derp_cmd_with_config(config_path: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("derp"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("DERP_CONFIG", config_path);
    cmd.env("NO_COLOR", "1");
    for key in [
        "OLLAMA_HOST",
        "LMSTUDIO_URL",
        "OPENAI_API_KEY",
        "BEDROCK_URL",
        "OPENROUTER_API_KEY",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Write a config file pointing the Ollama backend at `host`.
#[allow(dead_code)]
pub fn write_ollama_config(path: &Path, host: &str) {
    let config = serde_json::json!({
        "provider": "ollama",
        "ollamaHost": host,
        "engine": "grep",
        "timeoutSecs": 5,
    });
    std::fs::write(path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
}
