// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent Gateway Domain Interface (Anti-Corruption Layer)
//
// The hosted agent runtime does all requirement analysis and test synthesis.
// This interface forwards a prompt to a named agent and hands back whatever
// the runtime returned. No local fallback generator exists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const SEQUENTIAL_WORKFLOW: &str = "sequential_workflow";
pub const REQUIREMENT_ANALYZER: &str = "requirement_analyzer_agent";
pub const TEST_CASE_GENERATOR: &str = "test_case_generator_agent";

pub const KNOWN_AGENTS: [&str; 3] = [SEQUENTIAL_WORKFLOW, REQUIREMENT_ANALYZER, TEST_CASE_GENERATOR];

#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Send `prompt` to `agent` and return the runtime's output verbatim
    async fn run(&self, agent: &str, prompt: &str) -> Result<AgentResponse, GatewayError>;

    /// Check the agent runtime is reachable
    async fn health_check(&self) -> Result<(), GatewayError>;
}

/// Opaque agent output. Guaranteed non-null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentResponse(Value);

impl AgentResponse {
    pub fn new(value: Value) -> Result<Self, GatewayError> {
        if value.is_null() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Concatenated text parts of every event in the response.
    ///
    /// The runtime answers `/run` with a list of events shaped like
    /// `{author, content: {parts: [{text}]}}`; a bare string is returned as is.
    pub fn text(&self) -> String {
        let mut out = Vec::new();
        collect_text(&self.0, &mut out);
        out.join("\n")
    }

    /// Text produced by events whose `author` equals `agent`
    pub fn text_from(&self, agent: &str) -> String {
        let mut out = Vec::new();
        if let Value::Array(events) = &self.0 {
            for event in events {
                if event.get("author").and_then(Value::as_str) == Some(agent) {
                    collect_text(event, &mut out);
                }
            }
        }
        out.join("\n")
    }
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(map) => {
            if let Some(parts) = map.get("content").and_then(|c| c.get("parts")).and_then(Value::as_array) {
                for part in parts {
                    if let Some(text) = part.get("text").and_then(Value::as_str) {
                        out.push(text.to_string());
                    }
                }
            } else if let Some(text) = map.get("text").and_then(Value::as_str) {
                out.push(text.to_string());
            }
        }
        _ => {}
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Agent call timed out: {0}")]
    Timeout(String),

    #[error("Agent runtime returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Agent runtime returned an empty response")]
    EmptyResponse,

    #[error("Invalid agent response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_response_is_rejected() {
        assert!(matches!(AgentResponse::new(Value::Null), Err(GatewayError::EmptyResponse)));
        assert!(AgentResponse::new(json!([])).is_ok());
    }

    #[test]
    fn test_text_extraction_from_events() {
        let response = AgentResponse::new(json!([
            {"author": "requirement_analyzer_agent", "content": {"parts": [{"text": "REQ-1: login"}]}},
            {"author": "test_case_generator_agent", "content": {"parts": [{"text": "TC_LOGIN_001"}, {"text": "steps"}]}},
            {"author": "test_case_generator_agent", "actions": {}}
        ]))
        .unwrap();

        assert_eq!(response.text(), "REQ-1: login\nTC_LOGIN_001\nsteps");
        assert_eq!(response.text_from(TEST_CASE_GENERATOR), "TC_LOGIN_001\nsteps");
        assert_eq!(response.text_from("nobody"), "");
    }
}
