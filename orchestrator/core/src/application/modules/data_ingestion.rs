// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Data Ingestion Module
//!
//! Embeds text through the embedding adapter and stores the vectors in the
//! vector index (`embed_and_store`), or runs a nearest-neighbour search
//! (`query_vectors`).

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::application::services::ServiceSettings;
use crate::application::text_processing::SentenceChunker;
use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};
use crate::domain::stores::{DocumentStore, EmbeddingProvider, VectorIndex, VectorRecord};

pub const ID: &str = "data_ingestion";
pub const INGESTED_COLLECTION: &str = "ingested_documents";

const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
enum IngestionRequest {
    EmbedAndStore {
        texts: Option<Vec<String>>,
        content: Option<String>,
        document_id: Option<String>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    QueryVectors {
        query: String,
        top_k: Option<usize>,
        #[serde(default)]
        filter: HashMap<String, String>,
    },
}

pub struct DataIngestionModule {
    descriptor: ModuleDescriptor,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    chunker: SentenceChunker,
}

impl DataIngestionModule {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorIndex>,
        documents: Arc<dyn DocumentStore>,
        settings: &ServiceSettings,
    ) -> Self {
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "Data Ingestion".to_string(),
                description: "Creates embeddings for text and stores them in the vector index, or queries the index for nearest neighbours".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["operation"],
                    "oneOf": [
                        {
                            "properties": {
                                "operation": {"const": "embed_and_store"},
                                "texts": {"type": "array", "minItems": 1, "items": {"type": "string", "minLength": 1}},
                                "content": {"type": "string", "minLength": 1},
                                "document_id": {"type": "string", "minLength": 1},
                                "metadata": {"type": "object"}
                            },
                            "anyOf": [{"required": ["texts"]}, {"required": ["content"]}]
                        },
                        {
                            "properties": {
                                "operation": {"const": "query_vectors"},
                                "query": {"type": "string", "minLength": 1},
                                "top_k": {"type": "integer", "minimum": 1, "maximum": 100},
                                "filter": {"type": "object", "additionalProperties": {"type": "string"}}
                            },
                            "required": ["query"]
                        }
                    ]
                }),
                output_schema: json!({
                    "type": "object",
                    "oneOf": [
                        {"required": ["document_id", "vectors_stored", "vector_ids"]},
                        {"required": ["results"]}
                    ]
                }),
            },
            embeddings,
            vectors,
            documents,
            chunker: SentenceChunker::new(settings.chunk_size, settings.chunk_overlap),
        }
    }

    async fn embed_and_store(
        &self,
        texts: Option<Vec<String>>,
        content: Option<String>,
        document_id: Option<String>,
        metadata: Map<String, Value>,
    ) -> Result<Value, ModuleError> {
        let document_id = document_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let texts = match (texts, content) {
            (Some(texts), _) => texts,
            (None, Some(content)) => self
                .chunker
                .chunk(&content, Some(&document_id), None)
                .into_iter()
                .map(|c| c.text)
                .collect(),
            (None, None) => Vec::new(),
        };
        if texts.is_empty() {
            return Err(ModuleError::InvalidInput(
                "no text long enough to embed was provided".to_string(),
            ));
        }

        let vectors = self.embeddings.embed_batch(&texts).await?;

        let records: Vec<VectorRecord> = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (text, vector))| {
                let mut payload: HashMap<String, Value> =
                    metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                payload.insert("document_id".to_string(), json!(document_id));
                payload.insert("chunk_index".to_string(), json!(index));
                VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    text,
                    metadata: payload,
                }
            })
            .collect();

        let vector_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let stored = self.vectors.upsert(records).await?;

        self.documents
            .put(
                INGESTED_COLLECTION,
                &document_id,
                &json!({
                    "document_id": document_id,
                    "vector_ids": vector_ids,
                    "metadata": metadata,
                    "ingested_at": Utc::now(),
                }),
            )
            .await?;

        info!(document_id = %document_id, vectors = stored, "Stored document embeddings");

        Ok(json!({
            "document_id": document_id,
            "vectors_stored": stored,
            "vector_ids": vector_ids,
            "dimension": self.embeddings.dimension(),
        }))
    }

    async fn query_vectors(
        &self,
        query: String,
        top_k: Option<usize>,
        filter: HashMap<String, String>,
    ) -> Result<Value, ModuleError> {
        let vector = self.embeddings.embed(&query).await?;
        let filter = (!filter.is_empty()).then_some(&filter);
        let matches = self
            .vectors
            .search(&vector, top_k.unwrap_or(DEFAULT_TOP_K), filter)
            .await?;

        Ok(json!({
            "query": query,
            "total_results": matches.len(),
            "results": matches,
        }))
    }
}

#[async_trait]
impl BusinessModule for DataIngestionModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        match serde_json::from_value(payload)? {
            IngestionRequest::EmbedAndStore {
                texts,
                content,
                document_id,
                metadata,
            } => self.embed_and_store(texts, content, document_id, metadata).await,
            IngestionRequest::QueryVectors { query, top_k, filter } => {
                self.query_vectors(query, top_k, filter).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::embedding_client::HashEmbeddingClient;
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use crate::infrastructure::vector::InMemoryVectorIndex;

    fn module() -> (DataIngestionModule, Arc<InMemoryDocumentStore>) {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let module = DataIngestionModule::new(
            Arc::new(HashEmbeddingClient::new(64)),
            Arc::new(InMemoryVectorIndex::new(64)),
            documents.clone(),
            &ServiceSettings::default(),
        );
        (module, documents)
    }

    #[tokio::test]
    async fn test_store_then_query_returns_closest_text() {
        let (module, documents) = module();
        let stored = module
            .run(json!({
                "operation": "embed_and_store",
                "document_id": "doc-1",
                "texts": ["user login with password", "monthly invoice export to csv"],
                "metadata": {"document_type": "requirements"}
            }))
            .await
            .unwrap();
        assert_eq!(stored["vectors_stored"], 2);
        assert!(documents.get(INGESTED_COLLECTION, "doc-1").await.unwrap().is_some());

        let found = module
            .run(json!({"operation": "query_vectors", "query": "user login with password", "top_k": 1}))
            .await
            .unwrap();
        assert_eq!(found["total_results"], 1);
        assert_eq!(found["results"][0]["text"], "user login with password");
        assert_eq!(found["results"][0]["metadata"]["document_type"], "requirements");
    }

    #[tokio::test]
    async fn test_content_is_chunked_before_embedding() {
        let (module, _) = module();
        let out = module
            .run(json!({"operation": "embed_and_store", "content": "The system shall export reports."}))
            .await
            .unwrap();
        assert_eq!(out["vectors_stored"], 1);
        assert!(out["document_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_content_without_sentences_is_rejected() {
        let (module, _) = module();
        let err = module
            .run(json!({"operation": "embed_and_store", "content": "tiny"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::InvalidInput(_)));
    }
}
