// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `testgen setup`: provision storage, then probe the remaining services
//!
//! Schema and vector collection failures abort; cache, embedding, agent and
//! ALM problems are reported but do not.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Display;

use testgen_core::infrastructure::build_services;

use super::Overrides;

fn report<E: Display>(component: &str, result: &Result<(), E>) {
    match result {
        Ok(()) => println!("  {} {}", "✓".green(), component),
        Err(e) => println!("  {} {}: {}", "✗".red(), component, e),
    }
}

pub async fn run(overrides: Overrides) -> Result<()> {
    let config = overrides.load_config()?;
    let built = build_services(&config).context("Failed to initialize service adapters")?;
    let services = &built.registry;

    println!("{}", "Provisioning storage:".bold());
    match &built.database {
        Some(db) => {
            db.ensure_schema().await.context("Failed to create relational schema")?;
            println!("  {} relational schema", "✓".green());
        }
        None => println!("  {} relational store is in-memory; nothing to provision", "-".dimmed()),
    }
    if let Some(db) = &built.document_database {
        db.ensure_schema().await.context("Failed to create document table")?;
        println!("  {} document table", "✓".green());
    }
    services
        .vectors
        .ensure_collection()
        .await
        .with_context(|| format!("Failed to create vector collection '{}'", config.spec.vector.collection))?;
    println!("  {} vector collection '{}'", "✓".green(), config.spec.vector.collection);
    println!();

    println!("{}", "Checking services:".bold());
    report("cache", &services.cache.health_check().await);
    report("embeddings", &services.embeddings.health_check().await);
    report("agent gateway", &services.agent.health_check().await);
    if let Some(alm) = &services.alm {
        report("alm", &alm.test_connection().await.map(|_| ()));
    }
    println!();

    println!("{}", "✓ Setup complete".green());
    Ok(())
}
