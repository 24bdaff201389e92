//! derp CLI - Natural language grep for regex-challenged developers
//!
//! Thin entry point; everything lives in the `derp_cli` library.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    derp_cli::run(std::env::args_os()).await
}
