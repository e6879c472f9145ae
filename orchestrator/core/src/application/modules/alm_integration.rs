// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ALM Integration Module
//!
//! Talks to the configured ALM tool through [`AlmClient`]. Test case batches
//! are validated against the test case schema before anything is created, and
//! every created test case is registered in the traceability matrix.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::modules::traceability::TraceabilityLedger;
use crate::domain::alm::{AlmClient, AlmError};
use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};
use crate::domain::test_case::{TestCase, TestCaseBatch};
use crate::domain::traceability::GenerationMethod;

pub const ID: &str = "alm_integration";

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
enum AlmRequest {
    TestConnection,
    FetchUserStory {
        user_story_id: u64,
    },
    ValidateTestCases {
        user_story_id: u64,
        test_cases: Vec<TestCase>,
    },
    PushTestCases {
        user_story_id: u64,
        test_cases: Vec<TestCase>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    SearchWorkItems {
        query: String,
        #[serde(default)]
        work_item_types: Vec<String>,
    },
}

pub struct AlmIntegrationModule {
    descriptor: ModuleDescriptor,
    client: Option<Arc<dyn AlmClient>>,
    ledger: Arc<TraceabilityLedger>,
}

impl AlmIntegrationModule {
    pub fn new(client: Option<Arc<dyn AlmClient>>, ledger: Arc<TraceabilityLedger>) -> Self {
        let story = json!({"type": "integer", "minimum": 1});
        let cases = json!({"type": "array", "minItems": 1, "items": {"type": "object"}});
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "ALM Integration".to_string(),
                description: "Fetches user stories from and pushes validated test cases to the ALM tool".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["operation"],
                    "oneOf": [
                        {"properties": {"operation": {"const": "test_connection"}}},
                        {
                            "properties": {"operation": {"const": "fetch_user_story"}, "user_story_id": story},
                            "required": ["user_story_id"]
                        },
                        {
                            "properties": {
                                "operation": {"const": "validate_test_cases"},
                                "user_story_id": story,
                                "test_cases": cases
                            },
                            "required": ["user_story_id", "test_cases"]
                        },
                        {
                            "properties": {
                                "operation": {"const": "push_test_cases"},
                                "user_story_id": story,
                                "test_cases": cases,
                                "metadata": {"type": "object"}
                            },
                            "required": ["user_story_id", "test_cases"]
                        },
                        {
                            "properties": {
                                "operation": {"const": "search_work_items"},
                                "query": {"type": "string", "minLength": 1},
                                "work_item_types": {"type": "array", "items": {"type": "string", "minLength": 1}}
                            },
                            "required": ["query"]
                        }
                    ]
                }),
                output_schema: json!({"type": "object"}),
            },
            client,
            ledger,
        }
    }

    fn client(&self) -> Result<&Arc<dyn AlmClient>, ModuleError> {
        self.client.as_ref().ok_or(ModuleError::Alm(AlmError::NotConfigured))
    }

    async fn push_test_cases(&self, mut batch: TestCaseBatch) -> Result<Value, ModuleError> {
        let report = batch.validate();
        if !report.is_valid {
            return Err(ModuleError::InvalidInput(report.errors.join("; ")));
        }
        let client = self.client()?;

        let mut created = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;
        for test_case in &batch.test_cases {
            match client.create_test_case(batch.user_story_id, test_case).await {
                Ok(result) => created.push(result),
                Err(e) => {
                    warn!(user_story_id = batch.user_story_id, title = %test_case.title, error = %e, "Failed to create test case");
                    failed.push(json!({"title": test_case.title, "error": e.to_string()}));
                    first_error.get_or_insert(e);
                }
            }
        }

        if created.is_empty() {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        let user_story_id = batch.user_story_id;
        let generation_method = match batch.metadata.get("generation_method").and_then(Value::as_str) {
            Some("manual") => GenerationMethod::Manual,
            Some("imported") => GenerationMethod::Imported,
            _ => GenerationMethod::AgentGenerated,
        };
        let registered: Vec<(u64, String)> = created
            .iter()
            .map(|c| {
                let title = c.title.clone().unwrap_or_default();
                (c.test_case_id, title)
            })
            .collect();
        self.ledger
            .update(|matrix| {
                for (id, title) in &registered {
                    matrix.register_test_case(*id, title, "active", &[user_story_id], generation_method);
                }
                Ok(())
            })
            .await?;

        metrics::counter!("testgen_alm_test_cases_created_total").increment(created.len() as u64);
        info!(user_story_id, created = created.len(), failed = failed.len(), "Pushed test cases to ALM");

        Ok(json!({
            "user_story_id": user_story_id,
            "success": failed.is_empty(),
            "created_count": created.len(),
            "created": created,
            "failed": failed,
        }))
    }
}

#[async_trait]
impl BusinessModule for AlmIntegrationModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        match serde_json::from_value(payload)? {
            AlmRequest::TestConnection => {
                let project = self.client()?.test_connection().await?;
                Ok(json!({"connected": true, "project": project}))
            }
            AlmRequest::FetchUserStory { user_story_id } => {
                let story = self.client()?.fetch_user_story(user_story_id).await?;
                Ok(serde_json::to_value(story)?)
            }
            AlmRequest::ValidateTestCases {
                user_story_id,
                test_cases,
            } => {
                let mut batch = TestCaseBatch {
                    user_story_id,
                    test_cases,
                    metadata: Map::new(),
                };
                let report = batch.validate();
                Ok(json!({
                    "validation_passed": report.is_valid,
                    "errors": report.errors,
                    "test_cases": batch.test_cases,
                }))
            }
            AlmRequest::PushTestCases {
                user_story_id,
                test_cases,
                metadata,
            } => {
                self.push_test_cases(TestCaseBatch {
                    user_story_id,
                    test_cases,
                    metadata,
                })
                .await
            }
            AlmRequest::SearchWorkItems { query, work_item_types } => {
                let items = self.client()?.search_work_items(&query, &work_item_types).await?;
                Ok(json!({
                    "query": query,
                    "total_count": items.len(),
                    "work_items": items,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alm::{CreatedTestCase, ProjectInfo, UserStory, WorkItemRef};
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeAlm {
        next_id: AtomicU64,
    }

    #[async_trait]
    impl AlmClient for FakeAlm {
        async fn test_connection(&self) -> Result<ProjectInfo, AlmError> {
            Ok(ProjectInfo {
                id: Some("p1".to_string()),
                name: Some("Demo".to_string()),
                description: None,
                url: None,
            })
        }

        async fn fetch_user_story(&self, user_story_id: u64) -> Result<UserStory, AlmError> {
            Err(AlmError::NotFound(user_story_id.to_string()))
        }

        async fn create_test_case(&self, user_story_id: u64, test_case: &TestCase) -> Result<CreatedTestCase, AlmError> {
            if test_case.title.contains("reject") {
                return Err(AlmError::Api {
                    status: 400,
                    body: "rejected".to_string(),
                });
            }
            Ok(CreatedTestCase {
                test_case_id: self.next_id.fetch_add(1, Ordering::SeqCst),
                title: Some(test_case.title.clone()),
                user_story_id,
                url: None,
                link_success: true,
                link_warning: None,
            })
        }

        async fn search_work_items(&self, _query: &str, _types: &[String]) -> Result<Vec<WorkItemRef>, AlmError> {
            Ok(vec![WorkItemRef { id: 5, url: None }])
        }
    }

    fn module(client: Option<Arc<dyn AlmClient>>) -> (AlmIntegrationModule, Arc<TraceabilityLedger>) {
        let ledger = Arc::new(TraceabilityLedger::new(Arc::new(InMemoryDocumentStore::new())));
        (AlmIntegrationModule::new(client, ledger.clone()), ledger)
    }

    fn case(title: &str) -> Value {
        json!({
            "title": title,
            "description": "Checks login",
            "steps": [{"action": "Open login page", "expected": "Form shown"}]
        })
    }

    #[tokio::test]
    async fn test_push_records_traceability() {
        let (module, ledger) = module(Some(Arc::new(FakeAlm { next_id: AtomicU64::new(900) })));
        let out = module
            .run(json!({
                "operation": "push_test_cases",
                "user_story_id": 12,
                "test_cases": [case("Valid login"), case("Please reject me")]
            }))
            .await
            .unwrap();

        assert_eq!(out["created_count"], 1);
        assert_eq!(out["success"], false);
        assert_eq!(out["failed"][0]["title"], "Please reject me");

        let matrix = ledger.load().await.unwrap();
        assert!(matrix.entries[&12].test_case_ids.contains(&900));
        assert_eq!(matrix.test_cases[&900].generation_method, GenerationMethod::AgentGenerated);
    }

    #[tokio::test]
    async fn test_invalid_batch_is_rejected_before_alm_call() {
        let (module, _) = module(Some(Arc::new(FakeAlm { next_id: AtomicU64::new(1) })));
        let err = module
            .run(json!({
                "operation": "push_test_cases",
                "user_story_id": 12,
                "test_cases": [case("Same"), case("Same")]
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::InvalidInput(msg) if msg.contains("unique")));
    }

    #[tokio::test]
    async fn test_unconfigured_client_reports_not_configured() {
        let (module, _) = module(None);
        let err = module.run(json!({"operation": "test_connection"})).await.unwrap_err();
        assert!(matches!(err, ModuleError::Alm(AlmError::NotConfigured)));

        let report = module
            .run(json!({"operation": "validate_test_cases", "user_story_id": 1, "test_cases": [case("  ")]}))
            .await
            .unwrap();
        assert_eq!(report["validation_passed"], false);
    }
}
