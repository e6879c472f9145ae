// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Software tuning module: stores a profile of the software under test and
//! renders it as a prompt fragment for generation requests.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};
use crate::domain::stores::DocumentStore;

pub const ID: &str = "software_tuning";
pub const PROFILES_COLLECTION: &str = "software_profiles";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareProfile {
    pub profile_id: String,
    pub software: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<Utc>>,
}

impl SoftwareProfile {
    /// Stable id from name and version, so re-submitting a profile replaces it
    pub fn id_for(software: &str, version: Option<&str>) -> String {
        let raw = match version {
            Some(v) if !v.trim().is_empty() => format!("{}-{}", software.trim(), v.trim()),
            _ => software.trim().to_string(),
        };
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c.to_ascii_lowercase() } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Prompt fragment passed as `software_context` to test generation
    pub fn context(&self) -> String {
        let mut lines = vec![match &self.version {
            Some(v) => format!("Software under test: {} (version {})", self.software, v),
            None => format!("Software under test: {}", self.software),
        }];
        if !self.components.is_empty() {
            lines.push(format!("Components: {}", self.components.join(", ")));
        }
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            lines.push(format!("Notes: {}", notes.trim()));
        }
        if !self.requirements.is_empty() {
            lines.push("Platform requirements:".to_string());
            lines.extend(self.requirements.iter().map(|r| format!("- {}", r)));
        }
        lines.push("Tailor test steps and expected results to this software.".to_string());
        lines.join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct ProfileInput {
    software: String,
    version: Option<String>,
    #[serde(default)]
    components: Vec<String>,
    notes: Option<String>,
    #[serde(default)]
    requirements: Vec<String>,
}

pub struct SoftwareTuningModule {
    descriptor: ModuleDescriptor,
    documents: Arc<dyn DocumentStore>,
}

impl SoftwareTuningModule {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "Software Tuning".to_string(),
                description: "Stores a profile of the software under test and renders it as generation context".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["software"],
                    "properties": {
                        "software": {"type": "string", "minLength": 1, "pattern": "[A-Za-z0-9]"},
                        "version": {"type": "string"},
                        "components": {"type": "array", "items": {"type": "string", "minLength": 1}},
                        "notes": {"type": "string"},
                        "requirements": {"type": "array", "items": {"type": "string", "minLength": 1}}
                    }
                }),
                output_schema: json!({
                    "type": "object",
                    "required": ["profile_id", "profile", "context"]
                }),
            },
            documents,
        }
    }
}

#[async_trait]
impl BusinessModule for SoftwareTuningModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        let input: ProfileInput = serde_json::from_value(payload)?;
        let version = input.version.filter(|v| !v.trim().is_empty());
        let profile = SoftwareProfile {
            profile_id: SoftwareProfile::id_for(&input.software, version.as_deref()),
            software: input.software.trim().to_string(),
            version,
            components: input.components,
            notes: input.notes,
            requirements: input.requirements,
            updated_at: Some(Utc::now()),
        };

        self.documents
            .put(PROFILES_COLLECTION, &profile.profile_id, &serde_json::to_value(&profile)?)
            .await?;
        info!(profile_id = %profile.profile_id, "Stored software profile");

        Ok(json!({
            "profile_id": profile.profile_id,
            "context": profile.context(),
            "profile": profile,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryDocumentStore;

    #[test]
    fn test_profile_id_is_slugged() {
        assert_eq!(SoftwareProfile::id_for("Billing Portal", Some("2.1")), "billing-portal-2.1");
        assert_eq!(SoftwareProfile::id_for("  CRM ", None), "crm");
    }

    #[tokio::test]
    async fn test_profile_is_stored_and_rendered() {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let module = SoftwareTuningModule::new(documents.clone());
        let out = module
            .run(json!({
                "software": "Billing Portal",
                "version": "2.1",
                "components": ["invoices", "payments"],
                "requirements": ["Runs on PostgreSQL 16"]
            }))
            .await
            .unwrap();

        assert_eq!(out["profile_id"], "billing-portal-2.1");
        let context = out["context"].as_str().unwrap();
        assert!(context.starts_with("Software under test: Billing Portal (version 2.1)"));
        assert!(context.contains("Components: invoices, payments"));
        assert!(context.contains("- Runs on PostgreSQL 16"));

        let stored = documents
            .get(PROFILES_COLLECTION, "billing-portal-2.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["software"], "Billing Portal");
    }
}
