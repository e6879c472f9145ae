// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Generation Requests
//!
//! Per-request value objects handed to the agent gateway. They are built from
//! HTTP input, validated, turned into a prompt and then dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct RequestValidationError {
    pub field: String,
    pub message: String,
}

impl RequestValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    Basic,
    #[default]
    Comprehensive,
}

impl fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageLevel::Basic => f.write_str("basic"),
            CoverageLevel::Comprehensive => f.write_str("comprehensive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestGenerationRequest {
    pub requirements: String,

    #[serde(default)]
    pub coverage_level: CoverageLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Overrides the configured default agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl TestGenerationRequest {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self {
            requirements: requirements.into(),
            coverage_level: CoverageLevel::default(),
            domain_context: None,
            software_context: None,
            user_id: None,
            agent: None,
        }
    }

    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.requirements.trim().is_empty() {
            return Err(RequestValidationError::new(
                "requirements",
                "requirement text cannot be empty",
            ));
        }
        Ok(())
    }

    /// Prompt sent to the agent. Coverage level selects how many phases the
    /// agent is asked to report on.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!("Requirements:\n{}\n", self.requirements.trim());

        if let Some(domain) = self.domain_context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\nDomain context:\n{}\n", domain.trim()));
        }
        if let Some(software) = self.software_context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\nSoftware context:\n{}\n", software.trim()));
        }

        match self.coverage_level {
            CoverageLevel::Basic => prompt.push_str(
                "\nGenerate the essential positive and negative test cases for these requirements. \
                 Return them as a JSON list of objects with test_id, test_name, description, \
                 test_steps, expected_result and priority.",
            ),
            CoverageLevel::Comprehensive => prompt.push_str(
                "\nPlease provide detailed output for each step of the workflow:\n\
                 1. Requirements Analysis phase: list every functional and non-functional \
                 requirement you identified.\n\
                 2. Test Case Generation phase: generate comprehensive test cases covering \
                 positive, negative, boundary and edge scenarios. Return them as a JSON list of \
                 objects with test_id, test_name, description, test_steps, expected_result and \
                 priority.",
            ),
        }
        prompt
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementAnalysisRequest {
    pub requirements: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_depth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RequirementAnalysisRequest {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.requirements.trim().is_empty() {
            return Err(RequestValidationError::new(
                "requirements",
                "requirement text cannot be empty",
            ));
        }
        if let Some(depth) = &self.analysis_depth {
            if !matches!(depth.as_str(), "basic" | "standard" | "comprehensive") {
                return Err(RequestValidationError::new(
                    "analysis_depth",
                    format!("unsupported analysis depth '{}'", depth),
                ));
            }
        }
        Ok(())
    }

    pub fn to_prompt(&self, default_depth: &str) -> String {
        let depth = self.analysis_depth.as_deref().unwrap_or(default_depth);
        format!(
            "Analyze the following requirements with {} depth. Identify functional requirements, \
             non-functional requirements, ambiguities and missing acceptance criteria.\n\n{}",
            depth,
            self.requirements.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_requirements_fail_validation() {
        let request = TestGenerationRequest::new("   \n\t");
        let err = request.validate().unwrap_err();
        assert_eq!(err.field, "requirements");
    }

    #[test]
    fn test_coverage_level_defaults_to_comprehensive() {
        let request: TestGenerationRequest =
            serde_json::from_value(serde_json::json!({"requirements": "User can login"})).unwrap();
        assert_eq!(request.coverage_level, CoverageLevel::Comprehensive);
        assert!(request.to_prompt().contains("Requirements Analysis phase"));
    }

    #[test]
    fn test_basic_prompt_carries_contexts() {
        let mut request = TestGenerationRequest::new("User can login");
        request.coverage_level = CoverageLevel::Basic;
        request.domain_context = Some("banking".to_string());
        request.software_context = Some("  ".to_string());

        let prompt = request.to_prompt();
        assert!(prompt.starts_with("Requirements:\nUser can login\n"));
        assert!(prompt.contains("Domain context:\nbanking"));
        assert!(!prompt.contains("Software context"));
        assert!(!prompt.contains("Requirements Analysis phase"));
    }

    #[test]
    fn test_analysis_depth_is_checked() {
        let request = RequirementAnalysisRequest {
            requirements: "User can login".to_string(),
            analysis_depth: Some("deep".to_string()),
            user_id: None,
        };
        assert!(request.validate().is_err());
        assert!(request.to_prompt("comprehensive").contains("deep depth"));
    }
}
