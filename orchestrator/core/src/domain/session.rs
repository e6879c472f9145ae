// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Generation Sessions
//!
//! A session groups one generation run: the prompt a user submitted, the
//! requirements extracted from it and the test cases produced for them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entities persisted through [`crate::domain::stores::RelationalStore`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `{user}_{agent}_{unix millis}_{8 hex}`; the suffix keeps ids from
    /// requests in the same millisecond apart
    pub fn generate(user_id: &str, agent: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}_{}_{}",
            user_id,
            agent,
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn requirement_id(&self, index: usize) -> String {
        format!("{}_req_{}", self.0, index)
    }

    pub fn test_case_id(&self, index: usize) -> String {
        format!("{}_tc_{}", self.0, index)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: String,
    pub project_name: Option<String>,
    pub user_prompt: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: SessionId, user_id: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            session_id,
            user_id: user_id.into(),
            project_name: None,
            user_prompt: user_prompt.into(),
            status: "active".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Active,
    Edited,
    UserCreated,
    Deleted,
}

impl RequirementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Active => "active",
            RequirementStatus::Edited => "edited",
            RequirementStatus::UserCreated => "user_created",
            RequirementStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "edited" => RequirementStatus::Edited,
            "user_created" => RequirementStatus::UserCreated,
            "deleted" => RequirementStatus::Deleted,
            _ => RequirementStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub session_id: SessionId,
    pub original_content: String,
    pub edited_content: Option<String>,
    pub requirement_type: String,
    pub priority: String,
    pub status: RequirementStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Requirement {
    /// Edited text when present, otherwise the original
    pub fn effective_content(&self) -> &str {
        self.edited_content.as_deref().unwrap_or(&self.original_content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementUpdate {
    pub requirement_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub id: String,
    pub session_id: SessionId,
    pub test_name: String,
    pub test_description: String,
    /// Step list as produced by the agent; kept as JSON
    pub test_steps: Value,
    pub expected_results: String,
    pub test_type: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub requirement_ids: Vec<String>,
}

/// A test case that has not been stored yet. The store assigns its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTestCase {
    pub test_name: String,
    pub test_description: String,
    pub test_steps: Value,
    pub expected_results: String,
    pub test_type: String,
    pub priority: String,
    #[serde(default)]
    pub requirement_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub session_id: SessionId,
    pub total_requirements: usize,
    pub covered_requirements: usize,
    pub uncovered_requirements: Vec<String>,
    pub coverage_percentage: f64,
}

impl CoverageReport {
    /// Build a report from the active requirement ids and the ids linked to any test case
    pub fn compute<'a>(
        session_id: &SessionId,
        requirement_ids: impl IntoIterator<Item = &'a str>,
        linked: &std::collections::HashSet<String>,
    ) -> Self {
        let mut total = 0;
        let mut uncovered = Vec::new();
        for id in requirement_ids {
            total += 1;
            if !linked.contains(id) {
                uncovered.push(id.to_string());
            }
        }
        let covered = total - uncovered.len();
        let coverage_percentage = if total == 0 {
            0.0
        } else {
            ((covered as f64 / total as f64) * 10_000.0).round() / 100.0
        };
        Self {
            session_id: session_id.clone(),
            total_requirements: total,
            covered_requirements: covered,
            uncovered_requirements: uncovered,
            coverage_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_formats() {
        let session = SessionId::new("alice_sequential_workflow_1700000000");
        assert_eq!(session.requirement_id(2), "alice_sequential_workflow_1700000000_req_2");
        assert_eq!(session.test_case_id(0), "alice_sequential_workflow_1700000000_tc_0");
        assert!(SessionId::generate("bob", "test_case_generator_agent")
            .as_str()
            .starts_with("bob_test_case_generator_agent_"));
    }

    #[test]
    fn test_generated_ids_are_unique_within_a_millisecond() {
        let ids: HashSet<SessionId> = (0..64)
            .map(|_| SessionId::generate("alice", "sequential_workflow"))
            .collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn test_coverage_report_rounds_to_two_places() {
        let session = SessionId::new("s");
        let linked: HashSet<String> = ["s_req_0".to_string()].into_iter().collect();
        let report = CoverageReport::compute(&session, ["s_req_0", "s_req_1", "s_req_2"], &linked);
        assert_eq!(report.total_requirements, 3);
        assert_eq!(report.covered_requirements, 1);
        assert_eq!(report.uncovered_requirements, vec!["s_req_1", "s_req_2"]);
        assert_eq!(report.coverage_percentage, 33.33);

        let empty = CoverageReport::compute(&session, [], &linked);
        assert_eq!(empty.coverage_percentage, 0.0);
    }
}
