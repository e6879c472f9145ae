// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Adapter Factory
//!
//! Creates the concrete adapter for every collaborator from the configured
//! backend and assembles the [`ServiceRegistry`]. Called once at startup.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Maps configuration to `Arc<dyn Trait>` adapters

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::services::{ServiceRegistry, ServiceSettings};
use crate::domain::agent::AgentGateway;
use crate::domain::alm::AlmClient;
use crate::domain::service_config::{
    resolve_secret, CacheBackend, EmbeddingProviderKind, ServiceConfigManifest, StoreBackend, VectorBackend,
};
use crate::domain::stores::{CacheStore, DocumentStore, EmbeddingProvider, RelationalStore, VectorIndex};
use crate::infrastructure::agent::AdkAgentClient;
use crate::infrastructure::alm::AzureDevOpsClient;
use crate::infrastructure::cache::{InMemoryCache, RedisCache};
use crate::infrastructure::db::Database;
use crate::infrastructure::embedding_client::{HashEmbeddingClient, HttpEmbeddingClient};
use crate::infrastructure::repositories::{
    InMemoryDocumentStore, InMemoryRelationalStore, PostgresDocumentStore, PostgresRelationalStore,
};
use crate::infrastructure::vector::{InMemoryVectorIndex, QdrantVectorIndex};

/// The registry plus the handles `setup` needs to provision resources
pub struct BuiltServices {
    pub registry: ServiceRegistry,
    /// Pool behind the relational store, when it is Postgres
    pub database: Option<Database>,
    /// Pool behind the document store, when it is Postgres
    pub document_database: Option<Database>,
}

/// Creates a RelationalStore implementation based on the configured backend
pub fn create_relational_store(database: Option<&Database>) -> Arc<dyn RelationalStore> {
    match database {
        Some(db) => Arc::new(PostgresRelationalStore::new(db.get_pool().clone())),
        None => Arc::new(InMemoryRelationalStore::new()),
    }
}

/// Creates a DocumentStore implementation based on the configured backend
pub fn create_document_store(database: Option<&Database>) -> Arc<dyn DocumentStore> {
    match database {
        Some(db) => Arc::new(PostgresDocumentStore::new(db.get_pool().clone())),
        None => Arc::new(InMemoryDocumentStore::new()),
    }
}

pub fn create_vector_index(config: &ServiceConfigManifest) -> Result<Arc<dyn VectorIndex>> {
    let vector = &config.spec.vector;
    Ok(match vector.backend {
        VectorBackend::Memory => Arc::new(InMemoryVectorIndex::new(vector.dimension)),
        VectorBackend::Qdrant => {
            let api_key = vector.api_key.as_deref().map(resolve_secret).transpose()?;
            Arc::new(
                QdrantVectorIndex::new(&vector.url, api_key, &vector.collection, vector.dimension)
                    .context("Failed to configure Qdrant vector index")?,
            )
        }
    })
}

pub fn create_cache(config: &ServiceConfigManifest) -> Result<Arc<dyn CacheStore>> {
    let cache = &config.spec.cache;
    Ok(match cache.backend {
        CacheBackend::Memory => Arc::new(InMemoryCache::new()),
        CacheBackend::Redis => Arc::new(
            RedisCache::new(&resolve_secret(&cache.url)?).context("Failed to configure Redis cache")?,
        ),
    })
}

pub fn create_embedding_provider(config: &ServiceConfigManifest) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedding = &config.spec.embedding;
    let dimension = config.spec.vector.dimension;
    Ok(match embedding.provider {
        EmbeddingProviderKind::Hash => Arc::new(HashEmbeddingClient::new(dimension)),
        EmbeddingProviderKind::OpenaiCompatible => {
            let api_key = embedding.api_key.as_deref().map(resolve_secret).transpose()?;
            Arc::new(HttpEmbeddingClient::new(
                embedding.endpoint.clone(),
                embedding.model.clone(),
                api_key,
                dimension,
            ))
        }
    })
}

pub fn create_agent_gateway(config: &ServiceConfigManifest) -> Result<Arc<dyn AgentGateway>> {
    let agent = &config.spec.agent;
    let client = AdkAgentClient::new(
        &agent.endpoint,
        &agent.user_id,
        Duration::from_secs(agent.timeout_seconds),
    )
    .context("Failed to configure agent gateway")?;
    Ok(Arc::new(client))
}

pub fn create_alm_client(config: &ServiceConfigManifest) -> Result<Option<Arc<dyn AlmClient>>> {
    let Some(alm) = &config.spec.alm else {
        return Ok(None);
    };
    let token = resolve_secret(&alm.personal_access_token).context("Failed to resolve ALM access token")?;
    Ok(Some(Arc::new(AzureDevOpsClient::new(
        &alm.base_url,
        &alm.organization,
        &alm.project,
        &token,
    ))))
}

/// Build every adapter from configuration. Postgres pools connect lazily, so
/// this never waits on an external service.
pub fn build_services(config: &ServiceConfigManifest) -> Result<BuiltServices> {
    let spec = &config.spec;

    let database = match spec.relational.backend {
        StoreBackend::Postgres => Some(Database::connect_lazy(
            &resolve_secret(&spec.relational.url)?,
            spec.relational.max_connections,
        )?),
        StoreBackend::Memory => None,
    };

    let document_database = match spec.documents.backend {
        StoreBackend::Memory => None,
        StoreBackend::Postgres => {
            let url = config.document_store_url();
            match &database {
                Some(db) if url == spec.relational.url => Some(db.clone()),
                _ => Some(Database::connect_lazy(&resolve_secret(url)?, spec.relational.max_connections)?),
            }
        }
    };

    let registry = ServiceRegistry {
        relational: create_relational_store(database.as_ref()),
        documents: create_document_store(document_database.as_ref()),
        vectors: create_vector_index(config)?,
        cache: create_cache(config)?,
        embeddings: create_embedding_provider(config)?,
        agent: create_agent_gateway(config)?,
        alm: create_alm_client(config)?,
        settings: ServiceSettings::from_config(config),
    };

    info!(
        relational = ?spec.relational.backend,
        documents = ?spec.documents.backend,
        vector = ?spec.vector.backend,
        cache = ?spec.cache.backend,
        embedding = ?spec.embedding.provider,
        alm = registry.alm.is_some(),
        "Service adapters configured"
    );

    Ok(BuiltServices {
        registry,
        database,
        document_database,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service_config::AlmConfig;

    #[tokio::test]
    async fn test_default_config_builds_in_memory_services() {
        let built = build_services(&ServiceConfigManifest::default()).unwrap();
        assert!(built.database.is_none());
        assert!(built.document_database.is_none());
        assert!(built.registry.alm.is_none());
        assert_eq!(built.registry.embeddings.dimension(), 768);
        assert!(built.registry.relational.health_check().await.is_ok());
        assert!(built.registry.cache.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_postgres_backend_shares_one_lazy_pool() {
        let mut config = ServiceConfigManifest::default();
        config.spec.relational.backend = StoreBackend::Postgres;
        config.spec.documents.backend = StoreBackend::Postgres;

        let built = build_services(&config).unwrap();
        assert!(built.database.is_some());
        assert!(built.document_database.is_some());
    }

    #[test]
    fn test_alm_token_resolves_from_environment() {
        let mut config = ServiceConfigManifest::default();
        config.spec.alm = Some(AlmConfig {
            organization: "contoso".to_string(),
            project: "Billing".to_string(),
            personal_access_token: "env:TESTGEN_FACTORY_TEST_UNSET_PAT".to_string(),
            base_url: "https://dev.azure.com".to_string(),
        });
        assert!(create_alm_client(&config).is_err());

        config.spec.alm.as_mut().unwrap().personal_access_token = "literal-pat".to_string();
        assert!(create_alm_client(&config).unwrap().is_some());
    }
}
