// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain tuning module.
//!
//! Retrieves domain knowledge from the vector index and formats it as the
//! text-array context the generation agents consume.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};
use crate::domain::stores::{cache_key, CacheStore, EmbeddingProvider, VectorIndex, VectorMatch};

pub const ID: &str = "domain_tuning";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextScope {
    #[default]
    Comprehensive,
    Focused,
    Minimal,
}

impl ContextScope {
    fn as_str(&self) -> &'static str {
        match self {
            ContextScope::Comprehensive => "comprehensive",
            ContextScope::Focused => "focused",
            ContextScope::Minimal => "minimal",
        }
    }

    /// (top_k, search query)
    fn search_params(&self, query: &str) -> (usize, String) {
        match self {
            ContextScope::Comprehensive => (20, format!("requirements test cases {}", query)),
            ContextScope::Focused => (10, format!("requirements {}", query)),
            ContextScope::Minimal => (5, query.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContextInput {
    query: String,
    #[serde(default)]
    context_scope: ContextScope,
    domain: Option<String>,
}

pub struct DomainTuningModule {
    descriptor: ModuleDescriptor,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorIndex>,
    cache: Arc<dyn CacheStore>,
    cache_ttl_seconds: u64,
}

impl DomainTuningModule {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorIndex>,
        cache: Arc<dyn CacheStore>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "Domain Tuning".to_string(),
                description: "Retrieves domain knowledge from the vector index as grouped context for the generation agents".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["query"],
                    "properties": {
                        "query": {"type": "string", "minLength": 1},
                        "context_scope": {"enum": ["comprehensive", "focused", "minimal"]},
                        "domain": {"type": "string", "minLength": 1}
                    }
                }),
                output_schema: json!({
                    "type": "object",
                    "required": ["context", "result_count"],
                    "properties": {
                        "context": {"type": "array", "items": {"type": "string"}},
                        "result_count": {"type": "integer"},
                        "cached": {"type": "boolean"}
                    }
                }),
            },
            embeddings,
            vectors,
            cache,
            cache_ttl_seconds,
        }
    }
}

/// Group matches by their `document_type` metadata into a framed text array
pub fn format_context(query: &str, matches: &[VectorMatch]) -> Vec<String> {
    if matches.is_empty() {
        return Vec::new();
    }

    let mut requirements = Vec::new();
    let mut test_specs = Vec::new();
    let mut knowledge = Vec::new();

    for m in matches {
        let doc_type = m
            .metadata
            .get("document_type")
            .and_then(Value::as_str)
            .unwrap_or("general")
            .to_lowercase();
        let line = format!("[Score: {:.3}] {}", m.score, m.text);
        if doc_type.contains("requirement") {
            requirements.push(line);
        } else if doc_type.contains("test") {
            test_specs.push(line);
        } else {
            knowledge.push(line);
        }
    }

    let mut context = vec![format!("=== RAG CONTEXT FOR: {} ===", query)];
    for (header, group) in [
        ("=== REQUIREMENTS DOCUMENTATION ===", requirements),
        ("=== TEST SPECIFICATIONS ===", test_specs),
        ("=== DOMAIN KNOWLEDGE ===", knowledge),
    ] {
        if !group.is_empty() {
            context.push(header.to_string());
            context.extend(group);
        }
    }
    context.push("=== END RAG CONTEXT ===".to_string());
    context
}

#[async_trait]
impl BusinessModule for DomainTuningModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        let input: ContextInput = serde_json::from_value(payload)?;
        let scope = input.context_scope;
        let domain = input.domain.unwrap_or_default();
        let key = cache_key("domain_context", &[scope.as_str(), &domain, &input.query]);

        match self.cache.get(&key).await {
            Ok(Some(mut cached)) => {
                debug!(key = %key, "Domain context served from cache");
                cached["cached"] = json!(true);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Cache read failed, treating as miss"),
        }

        let (top_k, search_query) = scope.search_params(&input.query);
        let vector = self.embeddings.embed(&search_query).await?;
        let filter: HashMap<String, String> = if domain.is_empty() {
            HashMap::new()
        } else {
            HashMap::from([("domain".to_string(), domain.clone())])
        };
        let matches = self
            .vectors
            .search(&vector, top_k, (!filter.is_empty()).then_some(&filter))
            .await?;

        let context = format_context(&input.query, &matches);
        let result = json!({
            "query": input.query,
            "context_scope": scope,
            "domain": (!domain.is_empty()).then_some(domain),
            "result_count": matches.len(),
            "context": context,
            "cached": false,
        });

        if let Err(e) = self.cache.set(&key, &result, self.cache_ttl_seconds).await {
            warn!(error = %e, "Cache write failed");
        }
        Ok(result)
    }
}
