// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// External Store Interfaces (Anti-Corruption Layer)
//
// Capability-oriented traits for every managed storage collaborator. Concrete
// adapters live in infrastructure/ and translate vendor failures into
// AdapterError so nothing above this layer sees SDK error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::session::{
    CoverageReport, NewTestCase, Requirement, RequirementStatus, RequirementUpdate, Session,
    SessionId, TestCaseRecord,
};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for AdapterError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AdapterError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => AdapterError::Timeout("connection pool timed out".to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                AdapterError::Serialization(err.to_string())
            }
            other => AdapterError::ConnectionFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

/// Sessions, requirements and generated test cases
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<(), AdapterError>;

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, AdapterError>;

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, AdapterError>;

    async fn update_session_status(&self, id: &SessionId, status: &str) -> Result<(), AdapterError>;

    /// Insert requirements, numbering ids after any existing ones
    async fn save_requirements(
        &self,
        session_id: &SessionId,
        contents: &[String],
        status: RequirementStatus,
    ) -> Result<Vec<Requirement>, AdapterError>;

    /// Requirements that are not soft-deleted, in creation order
    async fn list_requirements(&self, session_id: &SessionId) -> Result<Vec<Requirement>, AdapterError>;

    async fn update_requirement(
        &self,
        session_id: &SessionId,
        update: &RequirementUpdate,
    ) -> Result<Requirement, AdapterError>;

    async fn delete_requirement(&self, session_id: &SessionId, requirement_id: &str) -> Result<(), AdapterError>;

    /// Insert test cases and their `direct` requirement links, numbering ids
    /// after every test case the session already has
    async fn save_test_cases(
        &self,
        session_id: &SessionId,
        test_cases: &[NewTestCase],
    ) -> Result<Vec<TestCaseRecord>, AdapterError>;

    /// Active test cases in creation order
    async fn list_test_cases(&self, session_id: &SessionId) -> Result<Vec<TestCaseRecord>, AdapterError>;

    /// Mark every active test case of the session as `replaced`; returns how many changed
    async fn retire_test_cases(&self, session_id: &SessionId) -> Result<u64, AdapterError>;

    async fn coverage_report(&self, session_id: &SessionId) -> Result<CoverageReport, AdapterError>;

    async fn health_check(&self) -> Result<(), AdapterError>;
}

/// Schemaless JSON documents grouped into named collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, collection: &str, id: &str, body: &Value) -> Result<(), AdapterError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AdapterError>;

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<Value>, AdapterError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, AdapterError>;

    async fn health_check(&self) -> Result<(), AdapterError>;
}

/// A vector plus its searchable payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: HashMap<String, Value>,
}

/// Nearest-neighbour index over embedding vectors
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if it does not exist yet
    async fn ensure_collection(&self) -> Result<(), AdapterError>;

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, AdapterError>;

    /// Cosine search; `filter` keys must all equal the record's metadata values
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<VectorMatch>, AdapterError>;

    async fn health_check(&self) -> Result<(), AdapterError>;
}

/// Key/value cache with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError>;

    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), AdapterError>;

    async fn delete(&self, key: &str) -> Result<(), AdapterError>;

    async fn health_check(&self) -> Result<(), AdapterError>;
}

/// Turns text into embedding vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdapterError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;

    async fn health_check(&self) -> Result<(), AdapterError>;
}

/// Deterministic cache key: sha256 over the ":"-joined parts
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(parts.join(":").as_bytes());
    format!("{}:{}", prefix, hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_and_prefixed() {
        let a = cache_key("testgen", &["login", "basic"]);
        let b = cache_key("testgen", &["login", "basic"]);
        let c = cache_key("testgen", &["login", "comprehensive"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("testgen:"));
        assert_eq!(a.len(), "testgen:".len() + 64);
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: AdapterError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AdapterError::NotFound(_)));
        let err: AdapterError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AdapterError::Timeout(_)));
    }
}
