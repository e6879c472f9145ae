// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Test Case Schema
//!
//! Canonical shape every test case must have before it is pushed to an ALM
//! tool. Validation trims text fields in place and reports every violation
//! at once, so callers can hand the full list back to the agent or user.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MAX_TITLE_LEN: usize = 255;
pub const DEFAULT_PRIORITY: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub action: String,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub title: String,
    pub description: String,
    pub steps: Vec<TestStep>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseBatch {
    pub user_story_id: u64,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of validating a test case or batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

impl TestStep {
    fn normalize(&mut self, path: &str, errors: &mut Vec<String>) {
        trim_in_place(&mut self.action);
        trim_in_place(&mut self.expected);
        if self.action.is_empty() {
            errors.push(format!("Field '{} -> action': cannot be empty or whitespace only", path));
        }
        if self.expected.is_empty() {
            errors.push(format!("Field '{} -> expected': cannot be empty or whitespace only", path));
        }
    }
}

impl TestCase {
    fn normalize(&mut self, path: &str, errors: &mut Vec<String>) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.description);

        if self.title.is_empty() {
            errors.push(format!("Field '{}title': cannot be empty or whitespace only", path));
        } else if self.title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!(
                "Field '{}title': must be at most {} characters",
                path, MAX_TITLE_LEN
            ));
        }
        if self.description.is_empty() {
            errors.push(format!("Field '{}description': cannot be empty or whitespace only", path));
        }
        if self.steps.is_empty() {
            errors.push(format!("Field '{}steps': test case must have at least one step", path));
        }
        if !(1..=4).contains(&self.priority) {
            errors.push(format!("Field '{}priority': must be between 1 and 4", path));
        }
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.normalize(&format!("{}steps -> {}", path, i), errors);
        }
    }

    /// Normalize and validate a single test case
    pub fn validate(&mut self) -> ValidationReport {
        let mut errors = Vec::new();
        self.normalize("", &mut errors);
        ValidationReport::from_errors(errors)
    }

    /// Steps rendered in the Azure DevOps `Microsoft.VSTS.TCM.Steps` XML format
    pub fn steps_xml(&self) -> String {
        if self.steps.is_empty() {
            return String::new();
        }
        let mut xml = format!(r#"<steps id="0" last="{}">"#, self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let expected = xml_escape(step.expected.trim());
            let step_type = if expected.is_empty() { "ActionStep" } else { "ValidateStep" };
            xml.push_str(&format!(
                r#"<step id="{}" type="{}"><parameterizedString isformatted="true">{}</parameterizedString><parameterizedString isformatted="true">{}</parameterizedString><description/></step>"#,
                i + 1,
                step_type,
                xml_escape(step.action.trim()),
                expected
            ));
        }
        xml.push_str("</steps>");
        xml
    }
}

impl TestCaseBatch {
    pub fn validate(&mut self) -> ValidationReport {
        let mut errors = Vec::new();
        if self.user_story_id == 0 {
            errors.push("Field 'user_story_id': must be a positive work item id".to_string());
        }
        if self.test_cases.is_empty() {
            errors.push("Field 'test_cases': batch must contain at least one test case".to_string());
        }
        for (i, case) in self.test_cases.iter_mut().enumerate() {
            case.normalize(&format!("test_cases -> {} -> ", i), &mut errors);
        }

        let mut seen = HashSet::new();
        if self.test_cases.iter().any(|tc| !seen.insert(tc.title.as_str())) {
            errors.push("Field 'test_cases': test case titles must be unique within a batch".to_string());
        }
        ValidationReport::from_errors(errors)
    }
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(title: &str) -> TestCase {
        TestCase {
            title: title.to_string(),
            description: "Verify login".to_string(),
            steps: vec![TestStep {
                action: " Enter credentials ".to_string(),
                expected: "Dashboard shown".to_string(),
            }],
            priority: DEFAULT_PRIORITY,
        }
    }

    #[test]
    fn test_valid_case_is_trimmed() {
        let mut tc = case("  Login works  ");
        let report = tc.validate();
        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(tc.title, "Login works");
        assert_eq!(tc.steps[0].action, "Enter credentials");
    }

    #[test]
    fn test_invalid_case_reports_every_violation() {
        let mut tc = TestCase {
            title: " ".to_string(),
            description: "".to_string(),
            steps: vec![],
            priority: 9,
        };
        let report = tc.validate();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_priority_defaults_to_two() {
        let tc: TestCase = serde_json::from_value(serde_json::json!({
            "title": "t", "description": "d", "steps": [{"action": "a", "expected": "e"}]
        }))
        .unwrap();
        assert_eq!(tc.priority, 2);
    }

    #[test]
    fn test_batch_rejects_duplicate_titles_after_trimming() {
        let mut batch = TestCaseBatch {
            user_story_id: 42,
            test_cases: vec![case("Login"), case("Login ")],
            metadata: Default::default(),
        };
        let report = batch.validate();
        assert!(!report.is_valid);
        assert!(report.errors[0].contains("unique"));
    }

    #[test]
    fn test_steps_xml_escapes_and_numbers_steps() {
        let mut tc = case("Login");
        tc.steps.push(TestStep {
            action: "Click <Submit> & wait".to_string(),
            expected: "".to_string(),
        });
        let xml = tc.steps_xml();
        assert!(xml.starts_with(r#"<steps id="0" last="2">"#));
        assert!(xml.contains(r#"<step id="1" type="ValidateStep">"#));
        assert!(xml.contains(r#"<step id="2" type="ActionStep">"#));
        assert!(xml.contains("Click &lt;Submit&gt; &amp; wait"));
        assert!(xml.ends_with("</steps>"));
    }
}
