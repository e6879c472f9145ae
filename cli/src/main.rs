// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Test Case Generation Service CLI
//!
//! The `testgen` binary runs the controller service and manages its backing
//! resources.
//!
//! ## Commands
//!
//! - `testgen serve` - Run the HTTP API until Ctrl-C or SIGTERM
//! - `testgen setup` - Provision the schema and vector collection, probe cache and agent
//! - `testgen seed` - Load a sample session into the configured stores
//! - `testgen config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use testgen_cli::commands::{self, ConfigCommand, Overrides};
use testgen_core::domain::service_config::ServiceConfigManifest;

/// Test case generation controller service
#[derive(Parser)]
#[command(name = "testgen")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TESTGEN_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (default: from config, 8000)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// HTTP API host (default: from config, 0.0.0.0)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[command(name = "serve")]
    Serve,

    /// Provision backing stores and check external services
    #[command(name = "setup")]
    Setup,

    /// Populate the stores with a sample session
    #[command(name = "seed")]
    Seed {
        /// Owner of the sample session
        #[arg(long, default_value = "demo_user")]
        user_id: String,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| configured_log_level(cli.config.clone()));
    init_logging(&level)?;

    let overrides = Overrides {
        config: cli.config,
        host: cli.host,
        port: cli.port,
    };

    match cli.command {
        Some(Commands::Serve) => commands::serve::run(overrides).await,
        Some(Commands::Setup) => commands::setup::run(overrides).await,
        Some(Commands::Seed { user_id }) => commands::seed::run(overrides, &user_id).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, overrides.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// `spec.logging.level` from the discovered config; commands report load
/// errors themselves, so a broken file only falls back to `info` here
fn configured_log_level(config_path: Option<PathBuf>) -> String {
    ServiceConfigManifest::load_or_default(config_path)
        .map(|config| config.spec.logging.level)
        .unwrap_or_else(|_| "info".to_string())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
