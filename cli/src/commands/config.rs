// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use testgen_core::domain::service_config::ServiceConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./testgen-config.yaml)
        #[arg(short, long, default_value = "./testgen-config.yaml")]
        output: PathBuf,

        /// Include every section with comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. TESTGEN_CONFIG_PATH: {}",
            std::env::var("TESTGEN_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./testgen-config.yaml");
        println!("  4. ~/.testgen/config.yaml");
        println!("  5. /etc/testgen/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Listen: {}:{}", spec.server.host, spec.server.port);
    println!();

    println!("{}", "Backends:".bold());
    println!("  Relational: {:?}", spec.relational.backend);
    println!("  Documents: {:?}", spec.documents.backend);
    println!("  Vector: {:?} ({}, dim {})", spec.vector.backend, spec.vector.collection, spec.vector.dimension);
    println!("  Cache: {:?} (ttl {}s)", spec.cache.backend, spec.cache.ttl_seconds);
    println!("  Embeddings: {:?} ({})", spec.embedding.provider, spec.embedding.model);
    println!();

    println!("{}", "Agent runtime:".bold());
    println!("  Endpoint: {}", spec.agent.endpoint);
    println!("  Default agent: {}", spec.agent.default_agent);
    println!("  Timeout: {}s", spec.agent.timeout_seconds);
    println!();

    println!("{}", "ALM:".bold());
    match &spec.alm {
        Some(alm) => println!("  Azure DevOps: {}/{}/{}", alm.base_url, alm.organization, alm.project),
        None => println!("  {}", "(not configured)".dimmed()),
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    if with_examples {
        std::fs::write(&output, include_str!("../../templates/config-with-examples.yaml"))
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    } else {
        ServiceConfigManifest::default().to_yaml_file(&output)?;
    }

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_configs_load_and_validate() {
        let dir = tempfile::tempdir().unwrap();

        let minimal = dir.path().join("minimal.yaml");
        generate(minimal.clone(), false).unwrap();
        let config = ServiceConfigManifest::from_yaml_file(&minimal).unwrap();
        config.validate().unwrap();

        let annotated = dir.path().join("annotated.yaml");
        generate(annotated.clone(), true).unwrap();
        let config = ServiceConfigManifest::from_yaml_file(&annotated).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spec.alm.as_ref().map(|a| a.project.as_str()), Some("Billing"));
    }
}
