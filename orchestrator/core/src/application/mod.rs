// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod analysis;
pub mod documents;
pub mod error;
pub mod modules;
pub mod registry;
pub mod services;
pub mod sessions;
pub mod text_processing;

pub use error::ServiceError;
pub use registry::{ModuleRegistry, RegistryError};
pub use services::{HealthReport, HealthStatus, ServiceRegistry, ServiceSettings};
