// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marlin - a long-running messaging agent.
//!
//! This is the binary entry point: configuration loading with diagnostic
//! rendering, tracing setup, and subcommand dispatch.

mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marlin_config::MarlinConfig;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Marlin - a long-running messaging agent.
#[derive(Parser, Debug)]
#[command(name = "marlin", version, about, long_about = None)]
struct Cli {
    /// Explicit config file path; the XDG hierarchy is used otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent against the configured transport.
    Serve,
    /// Print message cache statistics and counters.
    Status,
}

fn load_config(cli: &Cli) -> MarlinConfig {
    let result = match &cli.config {
        Some(path) => marlin_config::load_config_from_path(path)
            .map_err(marlin_config::diagnostic::figment_to_config_errors)
            .and_then(|config| {
                marlin_config::validation::validate_config(&config)?;
                Ok(config)
            }),
        None => marlin_config::load_and_validate(),
    };

    match result {
        Ok(config) => config,
        Err(errors) => {
            marlin_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn init_tracing(log_level: &str) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli);
    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run_from_config(config).await,
        Some(Commands::Status) => status::run(&config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "marlin exited with an error");
        std::process::exit(1);
    }
}
