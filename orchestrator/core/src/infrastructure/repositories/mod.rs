// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Store Implementations
//!
//! Infrastructure implementations of the relational and document store
//! traits defined in `domain::stores`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist sessions, requirements, test cases and JSON documents
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL
//! - **PostgresRelationalStore** - sessions, requirements, test cases and links
//! - **PostgresDocumentStore** - JSONB documents keyed by (collection, id)
//!
//! ## In-Memory
//! - **InMemoryRelationalStore** / **InMemoryDocumentStore** - used by the
//!   `memory` backends and by tests. State lives behind a `tokio::sync::RwLock`.

pub mod postgres_documents;
pub mod postgres_relational;

pub use postgres_documents::PostgresDocumentStore;
pub use postgres_relational::PostgresRelationalStore;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::session::{
    CoverageReport, NewTestCase, Requirement, RequirementStatus, RequirementUpdate, Session,
    SessionId, TestCaseRecord,
};
use crate::domain::stores::{AdapterError, DocumentStore, RelationalStore};

#[derive(Default)]
struct RelationalState {
    sessions: HashMap<SessionId, Session>,
    requirements: Vec<Requirement>,
    test_cases: Vec<TestCaseRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryRelationalStore {
    state: Arc<RwLock<RelationalState>>,
}

impl InMemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_session(id: &SessionId) -> AdapterError {
    AdapterError::NotFound(format!("session {}", id))
}

#[async_trait]
impl RelationalStore for InMemoryRelationalStore {
    async fn create_session(&self, session: &Session) -> Result<(), AdapterError> {
        let mut state = self.state.write().await;
        if state.sessions.contains_key(&session.session_id) {
            return Err(AdapterError::ConnectionFailure(format!(
                "duplicate session id {}",
                session.session_id
            )));
        }
        state.sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, AdapterError> {
        Ok(self.state.read().await.sessions.get(id).cloned())
    }

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, AdapterError> {
        let state = self.state.read().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn update_session_status(&self, id: &SessionId, status: &str) -> Result<(), AdapterError> {
        let mut state = self.state.write().await;
        let session = state.sessions.get_mut(id).ok_or_else(|| missing_session(id))?;
        session.status = status.to_string();
        Ok(())
    }

    async fn save_requirements(
        &self,
        session_id: &SessionId,
        contents: &[String],
        status: RequirementStatus,
    ) -> Result<Vec<Requirement>, AdapterError> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(session_id) {
            return Err(missing_session(session_id));
        }
        let start = state
            .requirements
            .iter()
            .filter(|r| &r.session_id == session_id)
            .count();

        let now = Utc::now();
        let saved: Vec<Requirement> = contents
            .iter()
            .enumerate()
            .map(|(i, content)| Requirement {
                id: session_id.requirement_id(start + i),
                session_id: session_id.clone(),
                original_content: content.clone(),
                edited_content: None,
                requirement_type: "functional".to_string(),
                priority: "medium".to_string(),
                status,
                version: 1,
                created_at: now,
                updated_at: now,
            })
            .collect();
        state.requirements.extend(saved.iter().cloned());
        Ok(saved)
    }

    async fn list_requirements(&self, session_id: &SessionId) -> Result<Vec<Requirement>, AdapterError> {
        let state = self.state.read().await;
        Ok(state
            .requirements
            .iter()
            .filter(|r| &r.session_id == session_id && r.status != RequirementStatus::Deleted)
            .cloned()
            .collect())
    }

    async fn update_requirement(
        &self,
        session_id: &SessionId,
        update: &RequirementUpdate,
    ) -> Result<Requirement, AdapterError> {
        let mut state = self.state.write().await;
        let requirement = state
            .requirements
            .iter_mut()
            .find(|r| {
                &r.session_id == session_id
                    && r.id == update.requirement_id
                    && r.status != RequirementStatus::Deleted
            })
            .ok_or_else(|| AdapterError::NotFound(format!("requirement {}", update.requirement_id)))?;

        requirement.edited_content = Some(update.content.clone());
        if requirement.status != RequirementStatus::UserCreated {
            requirement.status = RequirementStatus::Edited;
        }
        requirement.version += 1;
        requirement.updated_at = Utc::now();
        Ok(requirement.clone())
    }

    async fn delete_requirement(&self, session_id: &SessionId, requirement_id: &str) -> Result<(), AdapterError> {
        let mut state = self.state.write().await;
        let requirement = state
            .requirements
            .iter_mut()
            .find(|r| {
                &r.session_id == session_id && r.id == requirement_id && r.status != RequirementStatus::Deleted
            })
            .ok_or_else(|| AdapterError::NotFound(format!("requirement {}", requirement_id)))?;
        requirement.status = RequirementStatus::Deleted;
        requirement.updated_at = Utc::now();
        Ok(())
    }

    async fn save_test_cases(
        &self,
        session_id: &SessionId,
        test_cases: &[NewTestCase],
    ) -> Result<Vec<TestCaseRecord>, AdapterError> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(session_id) {
            return Err(missing_session(session_id));
        }
        let start = state
            .test_cases
            .iter()
            .filter(|t| &t.session_id == session_id)
            .count();

        let now = Utc::now();
        let saved: Vec<TestCaseRecord> = test_cases
            .iter()
            .enumerate()
            .map(|(i, tc)| TestCaseRecord {
                id: session_id.test_case_id(start + i),
                session_id: session_id.clone(),
                test_name: tc.test_name.clone(),
                test_description: tc.test_description.clone(),
                test_steps: tc.test_steps.clone(),
                expected_results: tc.expected_results.clone(),
                test_type: tc.test_type.clone(),
                priority: tc.priority.clone(),
                status: "active".to_string(),
                created_at: now,
                requirement_ids: tc.requirement_ids.clone(),
            })
            .collect();
        state.test_cases.extend(saved.iter().cloned());
        Ok(saved)
    }

    async fn list_test_cases(&self, session_id: &SessionId) -> Result<Vec<TestCaseRecord>, AdapterError> {
        let state = self.state.read().await;
        Ok(state
            .test_cases
            .iter()
            .filter(|t| &t.session_id == session_id && t.status == "active")
            .cloned()
            .collect())
    }

    async fn retire_test_cases(&self, session_id: &SessionId) -> Result<u64, AdapterError> {
        let mut state = self.state.write().await;
        let mut retired = 0;
        for tc in state
            .test_cases
            .iter_mut()
            .filter(|t| &t.session_id == session_id && t.status == "active")
        {
            tc.status = "replaced".to_string();
            retired += 1;
        }
        Ok(retired)
    }

    async fn coverage_report(&self, session_id: &SessionId) -> Result<CoverageReport, AdapterError> {
        let state = self.state.read().await;
        let linked: HashSet<String> = state
            .test_cases
            .iter()
            .filter(|t| &t.session_id == session_id && t.status == "active")
            .flat_map(|t| t.requirement_ids.iter().cloned())
            .collect();
        let ids = state
            .requirements
            .iter()
            .filter(|r| &r.session_id == session_id && r.status != RequirementStatus::Deleted)
            .map(|r| r.id.as_str());
        Ok(CoverageReport::compute(session_id, ids, &linked))
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, collection: &str, id: &str, body: &Value) -> Result<(), AdapterError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), body.clone());
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AdapterError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<Value>, AdapterError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, AdapterError> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}
