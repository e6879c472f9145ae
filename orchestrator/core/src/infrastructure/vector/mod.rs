// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vector Index Adapters
//!
//! [`InMemoryVectorIndex`] for tests and single-process deployments, and
//! [`QdrantVectorIndex`] for production.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements [`crate::domain::stores::VectorIndex`]

pub mod qdrant;

pub use qdrant::QdrantVectorIndex;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::stores::{AdapterError, VectorIndex, VectorMatch, VectorRecord};

/// Cosine similarity; 0.0 when the lengths differ or either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

fn metadata_matches(metadata: &HashMap<String, Value>, filter: &HashMap<String, String>) -> bool {
    filter.iter().all(|(key, expected)| match metadata.get(key) {
        Some(Value::String(actual)) => actual == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

#[derive(Clone)]
pub struct InMemoryVectorIndex {
    dimension: usize,
    records: Arc<RwLock<HashMap<String, VectorRecord>>>,
}

impl InMemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_collection(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, AdapterError> {
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(AdapterError::Serialization(format!(
                "Invalid embedding dimension for {}: expected {}, got {}",
                bad.id,
                self.dimension,
                bad.vector.len()
            )));
        }

        let count = records.len();
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<VectorMatch>, AdapterError> {
        let stored = self.records.read().await;

        let mut results: Vec<VectorMatch> = stored
            .values()
            .filter(|r| filter.map_or(true, |f| metadata_matches(&r.metadata, f)))
            .map(|r| VectorMatch {
                id: r.id.clone(),
                score: cosine_similarity(query, &r.vector),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, vector: Vec<f32>, doc_type: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            text: format!("text {}", id),
            metadata: HashMap::from([("document_type".to_string(), json!(doc_type))]),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_score_and_applies_filter() {
        let index = InMemoryVectorIndex::new(2);
        index
            .upsert(vec![
                record("a", vec![1.0, 0.0], "requirements"),
                record("b", vec![0.7, 0.7], "test_specs"),
                record("c", vec![0.0, 1.0], "requirements"),
            ])
            .await
            .unwrap();

        let all = index.search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(all.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        let filter = HashMap::from([("document_type".to_string(), "requirements".to_string())]);
        let filtered = index.search(&[0.7, 0.7], 5, Some(&filter)).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|m| m.id != "b"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension_and_replaces_by_id() {
        let index = InMemoryVectorIndex::new(2);
        assert!(index.upsert(vec![record("a", vec![1.0], "x")]).await.is_err());

        index.upsert(vec![record("a", vec![1.0, 0.0], "x")]).await.unwrap();
        index.upsert(vec![record("a", vec![0.0, 1.0], "x")]).await.unwrap();
        assert_eq!(index.len().await, 1);
    }
}
