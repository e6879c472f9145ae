// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The seven business modules, each invocable in isolation through the
//! [`ModuleRegistry`].

pub mod alm_integration;
pub mod data_ingestion;
pub mod document_parser;
pub mod domain_tuning;
pub mod software_tuning;
pub mod test_generation;
pub mod traceability;

use std::sync::Arc;

use crate::application::registry::{ModuleRegistry, RegistryError};
use crate::application::services::ServiceRegistry;

use self::traceability::TraceabilityLedger;

/// Register every business module against the given collaborators
pub fn build_registry(services: &ServiceRegistry) -> Result<ModuleRegistry, RegistryError> {
    let settings = &services.settings;
    let ledger = Arc::new(TraceabilityLedger::new(services.documents.clone()));

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(document_parser::DocumentParserModule::new(settings)))?;
    registry.register(Arc::new(data_ingestion::DataIngestionModule::new(
        services.embeddings.clone(),
        services.vectors.clone(),
        services.documents.clone(),
        settings,
    )))?;
    registry.register(Arc::new(domain_tuning::DomainTuningModule::new(
        services.embeddings.clone(),
        services.vectors.clone(),
        services.cache.clone(),
        settings.cache_ttl_seconds,
    )))?;
    registry.register(Arc::new(test_generation::TestGenerationModule::new(
        services.agent.clone(),
        services.relational.clone(),
        services.cache.clone(),
        settings,
    )))?;
    registry.register(Arc::new(software_tuning::SoftwareTuningModule::new(
        services.documents.clone(),
    )))?;
    registry.register(Arc::new(alm_integration::AlmIntegrationModule::new(
        services.alm.clone(),
        ledger.clone(),
    )))?;
    registry.register(Arc::new(traceability::TraceabilityModule::new(ledger)))?;
    Ok(registry)
}
