//! ciartifact CLI
//!
//! Resolves prebuilt CI artifacts for a repository: derives the cache key,
//! restores from the local cache, or downloads and installs the artifact
//! built from the branch head.

// CLI binary needs to output to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod config;
mod tracing;

use crate::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

async fn run() -> miette::Result<()> {
    let cli = cli::parse();

    init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.log_level.into(),
        ..TracingConfig::default()
    })?;

    commands::execute(cli).await
}
