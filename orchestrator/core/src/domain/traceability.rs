// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Traceability Matrix
//!
//! Tracks which ALM test cases verify which user stories. The matrix is a
//! plain value: the traceability module loads it from the document store,
//! mutates it and writes it back.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Story/test-case links, registry and reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const PENDING_REGISTRATION: &str = "Pending Registration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Archived,
    Deprecated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    Manual,
    AgentGenerated,
    Imported,
    Unknown,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Archived => "archived",
            EntryStatus::Deprecated => "deprecated",
        }
    }
}

impl GenerationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::Manual => "manual",
            GenerationMethod::AgentGenerated => "agent_generated",
            GenerationMethod::Imported => "imported",
            GenerationMethod::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceabilityEntry {
    pub user_story_id: u64,
    pub test_case_ids: BTreeSet<u64>,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseInfo {
    pub test_case_id: u64,
    pub title: String,
    pub status: String,
    pub linked_user_stories: BTreeSet<u64>,
    pub generation_method: GenerationMethod,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceabilityError {
    #[error("No traceability entry found for user story {0}")]
    UnknownStory(u64),

    #[error("Test case {test_case_id} not linked to user story {user_story_id}")]
    NotLinked { user_story_id: u64, test_case_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Summary,
    Detailed,
    Matrix,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceabilityMatrix {
    #[serde(default)]
    pub entries: BTreeMap<u64, TraceabilityEntry>,
    #[serde(default)]
    pub test_cases: BTreeMap<u64, TestCaseInfo>,
}

impl TraceabilityMatrix {
    /// Link test cases to a story. Returns "created" or "updated".
    pub fn add_entry(
        &mut self,
        user_story_id: u64,
        test_case_ids: &[u64],
        metadata: Option<Map<String, Value>>,
    ) -> &'static str {
        let now = Utc::now();
        let action = match self.entries.get_mut(&user_story_id) {
            Some(entry) => {
                entry.test_case_ids.extend(test_case_ids.iter().copied());
                entry.updated_at = now;
                if entry.status == EntryStatus::Deprecated && !entry.test_case_ids.is_empty() {
                    entry.status = EntryStatus::Active;
                }
                if let Some(metadata) = metadata {
                    entry.metadata.extend(metadata);
                }
                "updated"
            }
            None => {
                self.entries.insert(
                    user_story_id,
                    TraceabilityEntry {
                        user_story_id,
                        test_case_ids: test_case_ids.iter().copied().collect(),
                        status: EntryStatus::Active,
                        created_at: now,
                        updated_at: now,
                        metadata: metadata.unwrap_or_default(),
                    },
                );
                "created"
            }
        };

        for &tc_id in test_case_ids {
            let info = self.test_cases.entry(tc_id).or_insert_with(|| TestCaseInfo {
                test_case_id: tc_id,
                title: PENDING_REGISTRATION.to_string(),
                status: "pending".to_string(),
                linked_user_stories: BTreeSet::new(),
                generation_method: GenerationMethod::Unknown,
                created_at: now,
                last_updated: now,
            });
            info.linked_user_stories.insert(user_story_id);
            info.last_updated = now;
        }
        action
    }

    /// Register (or re-register) a test case and link it to its stories
    pub fn register_test_case(
        &mut self,
        test_case_id: u64,
        title: &str,
        status: &str,
        linked_user_stories: &[u64],
        generation_method: GenerationMethod,
    ) {
        let now = Utc::now();
        let created_at = self
            .test_cases
            .get(&test_case_id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        self.test_cases.insert(
            test_case_id,
            TestCaseInfo {
                test_case_id,
                title: title.to_string(),
                status: status.to_string(),
                linked_user_stories: linked_user_stories.iter().copied().collect(),
                generation_method,
                created_at,
                last_updated: now,
            },
        );

        for &story_id in linked_user_stories {
            let mut metadata = Map::new();
            metadata.insert("test_case_title".to_string(), json!(title));
            metadata.insert("generation_method".to_string(), json!(generation_method.as_str()));
            self.add_entry(story_id, &[test_case_id], Some(metadata));
        }
    }

    /// Remove one link. The entry becomes deprecated when no test cases remain.
    pub fn remove_link(&mut self, user_story_id: u64, test_case_id: u64) -> Result<&TraceabilityEntry, TraceabilityError> {
        let entry = self
            .entries
            .get_mut(&user_story_id)
            .ok_or(TraceabilityError::UnknownStory(user_story_id))?;

        if !entry.test_case_ids.remove(&test_case_id) {
            return Err(TraceabilityError::NotLinked {
                user_story_id,
                test_case_id,
            });
        }

        let now = Utc::now();
        entry.updated_at = now;
        if entry.test_case_ids.is_empty() {
            entry.status = EntryStatus::Deprecated;
        }

        if let Some(info) = self.test_cases.get_mut(&test_case_id) {
            if info.linked_user_stories.remove(&user_story_id) {
                info.last_updated = now;
            }
        }
        Ok(entry)
    }

    pub fn tests_for_story(&self, user_story_id: u64) -> Value {
        let Some(entry) = self.entries.get(&user_story_id) else {
            return json!({
                "user_story_id": user_story_id,
                "test_cases": [],
                "total_count": 0,
                "message": "No test cases found for this user story"
            });
        };

        let test_cases: Vec<Value> = entry
            .test_case_ids
            .iter()
            .map(|id| self.describe_test_case(*id))
            .collect();

        json!({
            "user_story_id": user_story_id,
            "total_count": test_cases.len(),
            "test_cases": test_cases,
            "traceability_status": entry.status,
            "last_updated": entry.updated_at,
        })
    }

    pub fn stories_for_test_case(&self, test_case_id: u64) -> Value {
        let Some(info) = self.test_cases.get(&test_case_id) else {
            return json!({
                "test_case_id": test_case_id,
                "user_stories": [],
                "total_count": 0,
                "message": "Test case not found in registry"
            });
        };

        let stories: Vec<Value> = info
            .linked_user_stories
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| {
                json!({
                    "user_story_id": entry.user_story_id,
                    "status": entry.status,
                    "total_test_cases": entry.test_case_ids.len(),
                    "last_updated": entry.updated_at,
                })
            })
            .collect();

        json!({
            "test_case_id": test_case_id,
            "test_case_title": info.title,
            "total_count": stories.len(),
            "user_stories": stories,
            "generation_method": info.generation_method,
        })
    }

    fn describe_test_case(&self, id: u64) -> Value {
        match self.test_cases.get(&id) {
            Some(info) => json!({
                "test_case_id": id,
                "title": info.title,
                "status": info.status,
                "generation_method": info.generation_method,
                "last_updated": info.last_updated,
            }),
            None => json!({
                "test_case_id": id,
                "title": "Unknown",
                "status": "unknown",
                "note": "Not found in test case registry",
            }),
        }
    }

    pub fn report(&self, format: ReportFormat) -> Value {
        match format {
            ReportFormat::Summary => self.summary_report(),
            ReportFormat::Detailed => self.detailed_report(),
            ReportFormat::Matrix => self.matrix_report(),
        }
    }

    fn summary_report(&self) -> Value {
        let total_stories = self.entries.len();

        let mut status_breakdown = BTreeMap::from([
            (EntryStatus::Active, 0usize),
            (EntryStatus::Archived, 0),
            (EntryStatus::Deprecated, 0),
        ]);
        for entry in self.entries.values() {
            *status_breakdown.entry(entry.status).or_default() += 1;
        }

        let mut generation_breakdown: BTreeMap<GenerationMethod, usize> = BTreeMap::new();
        for info in self.test_cases.values() {
            *generation_breakdown.entry(info.generation_method).or_default() += 1;
        }

        let with_tests = self.entries.values().filter(|e| !e.test_case_ids.is_empty()).count();
        let linked: usize = self.entries.values().map(|e| e.test_case_ids.len()).sum();
        let avg = linked as f64 / total_stories.max(1) as f64;

        json!({
            "report_type": "summary",
            "generated_at": Utc::now(),
            "totals": {
                "user_stories": total_stories,
                "test_cases": self.test_cases.len(),
            },
            "status_breakdown": status_breakdown
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), json!(v)))
                .collect::<Map<String, Value>>(),
            "generation_breakdown": generation_breakdown
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), json!(v)))
                .collect::<Map<String, Value>>(),
            "coverage_statistics": {
                "stories_with_tests": with_tests,
                "stories_without_tests": total_stories - with_tests,
                "avg_tests_per_story": avg,
            },
        })
    }

    fn detailed_report(&self) -> Value {
        let entries: Vec<Value> = self
            .entries
            .values()
            .map(|entry| {
                json!({
                    "user_story_id": entry.user_story_id,
                    "status": entry.status,
                    "test_case_count": entry.test_case_ids.len(),
                    "test_cases": entry
                        .test_case_ids
                        .iter()
                        .map(|id| self.describe_test_case(*id))
                        .collect::<Vec<_>>(),
                    "created_at": entry.created_at,
                    "updated_at": entry.updated_at,
                    "metadata": entry.metadata,
                })
            })
            .collect();

        let mut report = self.summary_report();
        if let Value::Object(map) = &mut report {
            map.insert("report_type".to_string(), json!("detailed"));
            map.insert("total_entries".to_string(), json!(entries.len()));
            map.insert("entries".to_string(), Value::Array(entries));
        }
        report
    }

    fn matrix_report(&self) -> Value {
        let rows: Vec<Value> = self
            .entries
            .values()
            .map(|entry| {
                json!({
                    "User_Story_ID": entry.user_story_id,
                    "Test_Case_IDs": entry.test_case_ids,
                    "Test_Case_Count": entry.test_case_ids.len(),
                    "Status": entry.status,
                    "Last_Updated": entry.updated_at,
                })
            })
            .collect();

        json!({
            "report_type": "matrix",
            "generated_at": Utc::now(),
            "headers": ["User_Story_ID", "Test_Case_IDs", "Test_Case_Count", "Status", "Last_Updated"],
            "matrix": rows,
        })
    }
}
