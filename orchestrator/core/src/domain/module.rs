// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Business Module Contract
//!
//! Every business capability (document parsing, ingestion, tuning, generation,
//! ALM sync, traceability) implements [`BusinessModule`] so it can be invoked in
//! isolation through the module registry.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Uniform "run in isolation" contract for the seven modules

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::domain::agent::GatewayError;
use crate::domain::alm::AlmError;
use crate::domain::generation::RequestValidationError;
use crate::domain::stores::AdapterError;

/// Stable identifier a module is registered and looked up under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Immutable description of a registered module.
///
/// `input_schema` and `output_schema` are JSON Schema documents. The registry
/// validates every payload against `input_schema` before the module runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

#[async_trait]
pub trait BusinessModule: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Run the module against an already schema-validated payload.
    async fn run(&self, payload: Value) -> Result<Value, ModuleError>;
}

#[derive(Debug, Error)]
pub enum ModuleError {
    /// Payload passed the schema but violates a semantic rule
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Agent gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Adapter failure: {0}")]
    Adapter(#[from] AdapterError),

    #[error("ALM failure: {0}")]
    Alm(#[from] AlmError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ModuleError {
    fn from(err: serde_json::Error) -> Self {
        ModuleError::InvalidInput(err.to_string())
    }
}

impl From<RequestValidationError> for ModuleError {
    fn from(err: RequestValidationError) -> Self {
        ModuleError::InvalidInput(err.to_string())
    }
}
