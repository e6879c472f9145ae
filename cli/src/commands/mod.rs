// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the testgen CLI

pub mod config;
pub mod seed;
pub mod serve;
pub mod setup;

use anyhow::{Context, Result};
use std::path::PathBuf;

use testgen_core::domain::service_config::ServiceConfigManifest;

pub use self::config::ConfigCommand;

/// Global flags that override the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Overrides {
    /// Discover, override and validate the configuration
    pub fn load_config(&self) -> Result<ServiceConfigManifest> {
        let mut config =
            ServiceConfigManifest::load_or_default(self.config.clone()).context("Failed to load configuration")?;
        if let Some(host) = &self.host {
            config.spec.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.spec.server.port = port;
        }
        config.validate().context("Configuration validation failed")?;
        Ok(config)
    }
}
