//! `derp --config`: print the effective configuration.

use anyhow::Result;
use colored::Colorize;
use derp_core::Config;
use derp_core::config::config_path_with;

/// Print where the configuration lives and its effective values, keys masked.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
pub fn run() -> Result<()> {
    let env = |key: &str| std::env::var(key).ok();
    let config = Config::load();

    println!("{}\n", "Current Configuration:".bold());
    match config_path_with(env) {
        Ok(path) if path.exists() => println!("{} {}", "File:".dimmed(), path.display()),
        Ok(path) => println!(
            "{} {} (not created yet, showing defaults)",
            "File:".dimmed(),
            path.display()
        ),
        Err(err) => println!("{} unavailable ({err})", "File:".dimmed()),
    }
    println!("{} {}", "Model:".dimmed(), config.effective_model());
    println!();
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
