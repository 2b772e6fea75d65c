// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bellhop - an AI customer support agent for WhatsApp.
//!
//! Binary entry point: parses the CLI, loads and validates configuration,
//! and dispatches to the `serve` or `check` command.

use std::path::{Path, PathBuf};

use bellhop_config::BellhopConfig;
use clap::{Parser, Subcommand};

mod check;
mod serve;

/// Bellhop - an AI customer support agent for WhatsApp.
#[derive(Parser, Debug)]
#[command(name = "bellhop", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the support agent: gateway, batcher, and turn pipeline.
    Serve {
        /// Path to a config file, instead of the XDG hierarchy.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Validate configuration and probe storage, then exit.
    Check {
        /// Path to a config file, instead of the XDG hierarchy.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Load configuration from an explicit path or the XDG hierarchy,
/// rendering diagnostics and exiting on failure.
fn load_config_or_exit(path: Option<&Path>) -> BellhopConfig {
    let result = match path {
        Some(path) => bellhop_config::load_config_from_path(path)
            .map_err(|err| {
                let source = std::fs::read_to_string(path)
                    .map(|content| vec![(path.display().to_string(), content)])
                    .unwrap_or_default();
                bellhop_config::diagnostic::figment_to_config_errors(err, &source)
            })
            .and_then(|config| {
                bellhop_config::validation::validate_config(&config)?;
                Ok(config)
            }),
        None => bellhop_config::load_and_validate(),
    };

    match result {
        Ok(config) => config,
        Err(errors) => {
            bellhop_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Serve { config } => {
            let config = load_config_or_exit(config.as_deref());
            serve::run_serve(config).await
        }
        Commands::Check { config } => {
            let config = load_config_or_exit(config.as_deref());
            check::run_check(config).await
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
