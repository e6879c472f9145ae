// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Traceability Module
//!
//! Story/test-case links over a [`TraceabilityMatrix`] persisted as a single
//! document in the document store. [`TraceabilityLedger`] serializes
//! read-modify-write cycles within this process; it is shared with the ALM
//! module, which records every test case it pushes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};
use crate::domain::stores::DocumentStore;
use crate::domain::traceability::{GenerationMethod, ReportFormat, TraceabilityError, TraceabilityMatrix};

pub const ID: &str = "traceability";
pub const TRACEABILITY_COLLECTION: &str = "traceability";
const MATRIX_DOCUMENT: &str = "matrix";

impl From<TraceabilityError> for ModuleError {
    fn from(err: TraceabilityError) -> Self {
        ModuleError::NotFound(err.to_string())
    }
}

pub struct TraceabilityLedger {
    documents: Arc<dyn DocumentStore>,
    write_lock: Mutex<()>,
}

impl TraceabilityLedger {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            documents,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<TraceabilityMatrix, ModuleError> {
        match self.documents.get(TRACEABILITY_COLLECTION, MATRIX_DOCUMENT).await? {
            Some(body) => Ok(serde_json::from_value(body)
                .map_err(|e| ModuleError::Internal(format!("corrupt traceability matrix: {}", e)))?),
            None => Ok(TraceabilityMatrix::default()),
        }
    }

    /// Apply `change` to the stored matrix and write it back if it succeeds
    pub async fn update<T, F>(&self, change: F) -> Result<T, ModuleError>
    where
        F: FnOnce(&mut TraceabilityMatrix) -> Result<T, ModuleError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut matrix = self.load().await?;
        let out = change(&mut matrix)?;
        let body = serde_json::to_value(&matrix)
            .map_err(|e| ModuleError::Internal(format!("cannot serialize traceability matrix: {}", e)))?;
        self.documents
            .put(TRACEABILITY_COLLECTION, MATRIX_DOCUMENT, &body)
            .await?;
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
enum TraceabilityRequest {
    Link {
        user_story_id: u64,
        test_case_ids: Vec<u64>,
        #[serde(default)]
        metadata: Option<Map<String, Value>>,
    },
    Unlink {
        user_story_id: u64,
        test_case_id: u64,
    },
    Register {
        test_case_id: u64,
        title: String,
        #[serde(default = "default_status")]
        status: String,
        #[serde(default)]
        user_story_ids: Vec<u64>,
        #[serde(default = "default_method")]
        generation_method: GenerationMethod,
    },
    TestsForStory {
        user_story_id: u64,
    },
    StoriesForTestCase {
        test_case_id: u64,
    },
    Report {
        #[serde(default = "default_format")]
        format: ReportFormat,
    },
}

fn default_status() -> String {
    "active".to_string()
}

fn default_method() -> GenerationMethod {
    GenerationMethod::Manual
}

fn default_format() -> ReportFormat {
    ReportFormat::Summary
}

pub struct TraceabilityModule {
    descriptor: ModuleDescriptor,
    ledger: Arc<TraceabilityLedger>,
}

impl TraceabilityModule {
    pub fn new(ledger: Arc<TraceabilityLedger>) -> Self {
        let id = json!({"type": "integer", "minimum": 1});
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "Traceability".to_string(),
                description: "Maintains the user story to test case traceability matrix".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["operation"],
                    "oneOf": [
                        {
                            "properties": {
                                "operation": {"const": "link"},
                                "user_story_id": id,
                                "test_case_ids": {"type": "array", "minItems": 1, "items": id},
                                "metadata": {"type": "object"}
                            },
                            "required": ["user_story_id", "test_case_ids"]
                        },
                        {
                            "properties": {
                                "operation": {"const": "unlink"},
                                "user_story_id": id,
                                "test_case_id": id
                            },
                            "required": ["user_story_id", "test_case_id"]
                        },
                        {
                            "properties": {
                                "operation": {"const": "register"},
                                "test_case_id": id,
                                "title": {"type": "string", "minLength": 1},
                                "status": {"type": "string"},
                                "user_story_ids": {"type": "array", "items": id},
                                "generation_method": {"enum": ["manual", "agent_generated", "imported", "unknown"]}
                            },
                            "required": ["test_case_id", "title"]
                        },
                        {
                            "properties": {"operation": {"const": "tests_for_story"}, "user_story_id": id},
                            "required": ["user_story_id"]
                        },
                        {
                            "properties": {"operation": {"const": "stories_for_test_case"}, "test_case_id": id},
                            "required": ["test_case_id"]
                        },
                        {
                            "properties": {
                                "operation": {"const": "report"},
                                "format": {"enum": ["summary", "detailed", "matrix"]}
                            }
                        }
                    ]
                }),
                output_schema: json!({"type": "object"}),
            },
            ledger,
        }
    }
}

#[async_trait]
impl BusinessModule for TraceabilityModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        match serde_json::from_value(payload)? {
            TraceabilityRequest::Link {
                user_story_id,
                test_case_ids,
                metadata,
            } => {
                let out = self
                    .ledger
                    .update(|matrix| {
                        let action = matrix.add_entry(user_story_id, &test_case_ids, metadata);
                        let entry = &matrix.entries[&user_story_id];
                        Ok(json!({
                            "action": action,
                            "user_story_id": user_story_id,
                            "test_case_ids": entry.test_case_ids,
                            "status": entry.status,
                        }))
                    })
                    .await?;
                info!(user_story_id, linked = test_case_ids.len(), "Updated traceability links");
                Ok(out)
            }
            TraceabilityRequest::Unlink {
                user_story_id,
                test_case_id,
            } => {
                self.ledger
                    .update(|matrix| {
                        let entry = matrix.remove_link(user_story_id, test_case_id)?;
                        Ok(json!({
                            "action": "unlinked",
                            "user_story_id": user_story_id,
                            "test_case_id": test_case_id,
                            "remaining_test_case_ids": entry.test_case_ids,
                            "status": entry.status,
                        }))
                    })
                    .await
            }
            TraceabilityRequest::Register {
                test_case_id,
                title,
                status,
                user_story_ids,
                generation_method,
            } => {
                self.ledger
                    .update(|matrix| {
                        matrix.register_test_case(test_case_id, &title, &status, &user_story_ids, generation_method);
                        Ok(json!({
                            "action": "registered",
                            "test_case_id": test_case_id,
                            "linked_user_stories": user_story_ids,
                        }))
                    })
                    .await
            }
            TraceabilityRequest::TestsForStory { user_story_id } => {
                Ok(self.ledger.load().await?.tests_for_story(user_story_id))
            }
            TraceabilityRequest::StoriesForTestCase { test_case_id } => {
                Ok(self.ledger.load().await?.stories_for_test_case(test_case_id))
            }
            TraceabilityRequest::Report { format } => Ok(self.ledger.load().await?.report(format)),
        }
    }
}
