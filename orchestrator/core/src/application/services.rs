// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service Registry
//!
//! One value holding every external collaborator, constructed once at startup
//! (see `infrastructure::factory`) and shared by reference with modules and
//! controllers. Replaces per-service global clients.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::agent::AgentGateway;
use crate::domain::alm::AlmClient;
use crate::domain::service_config::ServiceConfigManifest;
use crate::domain::stores::{CacheStore, DocumentStore, EmbeddingProvider, RelationalStore, VectorIndex};

/// Tunables the modules read at request time
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub cache_ttl_seconds: u64,
    pub default_agent: String,
    pub agent_user_id: String,
    pub analysis_depth: String,
    pub max_file_size_bytes: usize,
    pub max_batch_files: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&ServiceConfigManifest::default())
    }
}

impl ServiceSettings {
    pub fn from_config(config: &ServiceConfigManifest) -> Self {
        let spec = &config.spec;
        Self {
            chunk_size: spec.chunking.chunk_size,
            chunk_overlap: spec.chunking.chunk_overlap,
            cache_ttl_seconds: spec.cache.ttl_seconds,
            default_agent: spec.agent.default_agent.clone(),
            agent_user_id: spec.agent.user_id.clone(),
            analysis_depth: spec.agent.analysis_depth.clone(),
            max_file_size_bytes: spec.upload.max_file_size_bytes,
            max_batch_files: spec.upload.max_batch_files,
        }
    }
}

#[derive(Clone)]
pub struct ServiceRegistry {
    pub relational: Arc<dyn RelationalStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub vectors: Arc<dyn VectorIndex>,
    pub cache: Arc<dyn CacheStore>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub agent: Arc<dyn AgentGateway>,
    pub alm: Option<Arc<dyn AlmClient>>,
    pub settings: ServiceSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub reachable: bool,
    pub latency_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
}

async fn probe<F, E>(name: &'static str, check: F) -> ComponentHealth
where
    F: std::future::Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let result = check.await;
    ComponentHealth {
        name,
        reachable: result.is_ok(),
        latency_ms: started.elapsed().as_millis(),
        error: result.err().map(|e| e.to_string()),
    }
}

impl ServiceRegistry {
    /// Probe every configured adapter concurrently. Healthy only when all of them answer.
    pub async fn health(&self) -> HealthReport {
        let (relational, documents, vectors, cache, embeddings, agent) = tokio::join!(
            probe("relational_store", self.relational.health_check()),
            probe("document_store", self.documents.health_check()),
            probe("vector_index", self.vectors.health_check()),
            probe("cache", self.cache.health_check()),
            probe("embeddings", self.embeddings.health_check()),
            probe("agent_gateway", self.agent.health_check()),
        );

        let mut components = vec![relational, documents, vectors, cache, embeddings, agent];
        if let Some(alm) = &self.alm {
            components.push(probe("alm", async { alm.test_connection().await.map(|_| ()) }).await);
        }
        let status = if components.iter().all(|c| c.reachable) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        HealthReport { status, components }
    }
}
