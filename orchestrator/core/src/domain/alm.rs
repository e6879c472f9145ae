// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// ALM Domain Interface (Anti-Corruption Layer)
//
// Application lifecycle management tools (Azure DevOps today) own user stories
// and the test case work items linked to them. Implementations live in
// infrastructure/alm/.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::test_case::TestCase;

#[async_trait]
pub trait AlmClient: Send + Sync {
    async fn test_connection(&self) -> Result<ProjectInfo, AlmError>;

    async fn fetch_user_story(&self, user_story_id: u64) -> Result<UserStory, AlmError>;

    /// Create a test case work item and link it to `user_story_id`
    async fn create_test_case(&self, user_story_id: u64, test_case: &TestCase) -> Result<CreatedTestCase, AlmError>;

    async fn search_work_items(&self, query: &str, work_item_types: &[String]) -> Result<Vec<WorkItemRef>, AlmError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    pub id: u64,
    pub title: Option<String>,
    pub description: String,
    pub state: Option<String>,
    pub work_item_type: Option<String>,
    pub assigned_to: Option<String>,
    pub priority: Option<Value>,
    pub acceptance_criteria: String,
    pub tags: String,
    /// Ids of test cases linked through TestedBy relations
    pub linked_test_case_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTestCase {
    pub test_case_id: u64,
    pub title: Option<String>,
    pub user_story_id: u64,
    pub url: Option<String>,
    pub link_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemRef {
    pub id: u64,
    pub url: Option<String>,
}

#[derive(Debug, Error)]
pub enum AlmError {
    #[error("ALM integration is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Work item not found: {0}")]
    NotFound(String),

    #[error("ALM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
