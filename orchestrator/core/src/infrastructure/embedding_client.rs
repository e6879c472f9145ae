// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Embedding Provider Adapters
//
// HashEmbeddingClient: deterministic feature hashing, no network. Used in tests
// and when no embedding endpoint is configured.
// HttpEmbeddingClient: any endpoint speaking the OpenAI `/embeddings` contract
// (OpenAI, Ollama, vLLM, LM Studio).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::stores::{AdapterError, EmbeddingProvider};

pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Unit-length bag-of-words vector. Identical text yields identical vectors.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
            ]) as usize
                % self.dimension;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: String, model: String, api_key: Option<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            api_key,
            dimension,
        }
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AdapterError::Serialization("embedding response was empty".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdapterError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.url()).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::ConnectionFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AdapterError::ConnectionFailure(format!(
                "embedding endpoint returned HTTP {}: {}",
                status, error_text
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Serialization(format!("Failed to parse embedding response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(AdapterError::Serialization(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }
        body.data.sort_by_key(|d| d.index);

        body.data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimension {
                    Ok(d.embedding)
                } else {
                    Err(AdapterError::Serialization(format!(
                        "Invalid embedding dimension: expected {}, got {}",
                        self.dimension,
                        d.embedding.len()
                    )))
                }
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        self.embed("health check").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::vector::cosine_similarity;
    use serde_json::json;

    #[tokio::test]
    async fn test_hash_embeddings_are_deterministic_and_normalized() {
        let client = HashEmbeddingClient::new(64);
        let a = client.embed("User can log in").await.unwrap();
        let b = client.embed("user can LOG in").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);

        let empty = client.embed("").await.unwrap();
        assert!(empty.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_http_embeddings_reorders_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpEmbeddingClient::new(
            format!("{}/v1", server.url()),
            "nomic-embed-text".to_string(),
            Some("sk-test".to_string()),
            2,
        );
        let out = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_embeddings_surface_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = HttpEmbeddingClient::new(server.url(), "m".to_string(), None, 2);
        let err = client.embed("x").await.unwrap_err();
        assert!(matches!(err, AdapterError::ConnectionFailure(_)));
    }
}
