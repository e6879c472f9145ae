// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Qdrant-backed vector index. Record text travels in the payload under
//! `text`; every other payload key is metadata and can be filtered on.

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::stores::{AdapterError, VectorIndex, VectorMatch, VectorRecord};

const TEXT_KEY: &str = "text";

pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorIndex {
    pub fn new(url: &str, api_key: Option<String>, collection: &str, dimension: usize) -> Result<Self, AdapterError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| AdapterError::ConnectionFailure(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    fn record_to_point(record: VectorRecord) -> Result<PointStruct, AdapterError> {
        let mut body = serde_json::Map::new();
        for (key, value) in record.metadata {
            body.insert(key, value);
        }
        body.insert(TEXT_KEY.to_string(), Value::String(record.text));

        let payload = Payload::try_from(Value::Object(body))
            .map_err(|e| AdapterError::Serialization(e.to_string()))?;
        Ok(PointStruct::new(record.id, record.vector, payload))
    }
}

fn connection(context: &str) -> impl Fn(qdrant_client::QdrantError) -> AdapterError + '_ {
    move |e| AdapterError::ConnectionFailure(format!("{}: {}", context, e))
}

fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Value::from(d),
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(st)) => Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => Value::Null,
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn ensure_collection(&self) -> Result<(), AdapterError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(connection("Failed to check collection existence"))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine)),
                )
                .await
                .map_err(connection("Failed to create Qdrant collection"))?;
            info!(collection = %self.collection, dimension = self.dimension, "Created Qdrant collection");
        }
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, AdapterError> {
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(AdapterError::Serialization(format!(
                "Invalid embedding dimension: expected {}, got {}",
                self.dimension,
                bad.vector.len()
            )));
        }

        let count = records.len();
        let points = records
            .into_iter()
            .map(Self::record_to_point)
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(connection("Failed to upsert points"))?;
        debug!(collection = %self.collection, count, "Upserted vectors");
        Ok(count)
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<VectorMatch>, AdapterError> {
        let mut request =
            SearchPointsBuilder::new(&self.collection, query.to_vec(), top_k as u64).with_payload(true);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            request = request.filter(Filter::must(
                filter
                    .iter()
                    .map(|(key, value)| Condition::matches(key.as_str(), value.clone())),
            ));
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(connection("Failed to search Qdrant"))?;

        let matches = response
            .result
            .into_iter()
            .map(|point| {
                let id = point
                    .id
                    .and_then(|id| id.point_id_options)
                    .map(|options| match options {
                        qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u,
                        qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
                    })
                    .unwrap_or_default();

                let mut metadata: HashMap<String, Value> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, to_json(v)))
                    .collect();
                let text = match metadata.remove(TEXT_KEY) {
                    Some(Value::String(s)) => s,
                    _ => String::new(),
                };

                VectorMatch {
                    id,
                    score: point.score,
                    text,
                    metadata,
                }
            })
            .collect();
        Ok(matches)
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        self.client
            .health_check()
            .await
            .map_err(connection("Qdrant health check failed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_values_convert_back_to_json() {
        use qdrant_client::qdrant::{ListValue, Struct};

        let list = QdrantValue {
            kind: Some(Kind::ListValue(ListValue {
                values: vec![QdrantValue::from("a".to_string()), QdrantValue::from("b".to_string())],
            })),
        };
        let nested = QdrantValue {
            kind: Some(Kind::StructValue(Struct {
                fields: HashMap::from([("ok".to_string(), QdrantValue::from(true))]),
            })),
        };

        assert_eq!(to_json(QdrantValue::from("requirements".to_string())), json!("requirements"));
        assert_eq!(to_json(QdrantValue::from(3_i64)), json!(3));
        assert_eq!(to_json(QdrantValue::from(0.5_f64)), json!(0.5));
        assert_eq!(to_json(list), json!(["a", "b"]));
        assert_eq!(to_json(nested), json!({"ok": true}));
        assert_eq!(to_json(QdrantValue { kind: None }), Value::Null);
    }

    #[test]
    fn test_record_payload_carries_text_and_metadata() {
        let point = QdrantVectorIndex::record_to_point(VectorRecord {
            id: "6f1c9a52-4a7e-4c55-9a0e-2f3d0b6f7a10".to_string(),
            vector: vec![0.1, 0.2],
            text: "The system shall log in users".to_string(),
            metadata: HashMap::from([("document_type".to_string(), json!("requirements"))]),
        })
        .unwrap();
        assert_eq!(to_json(point.payload[TEXT_KEY].clone()), json!("The system shall log in users"));
        assert_eq!(to_json(point.payload["document_type"].clone()), json!("requirements"));
    }

    #[test]
    fn test_client_builds_without_connecting() {
        let index = QdrantVectorIndex::new("http://localhost:6334", None, "testgen_documents", 768).unwrap();
        assert_eq!(index.collection, "testgen_documents");
        assert_eq!(index.dimension, 768);
    }
}
