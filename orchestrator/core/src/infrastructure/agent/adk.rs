// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// ADK Agent Runtime Adapter
//
// Anti-Corruption Layer for the hosted agent runtime. Every call opens a fresh
// runtime session for the target app and then posts the prompt to `/run`.
// The runtime's JSON answer is passed through untouched.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::domain::agent::{AgentGateway, AgentResponse, GatewayError};

pub struct AdkAgentClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    app_name: &'a str,
    user_id: &'a str,
    session_id: &'a str,
    new_message: NewMessage<'a>,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

impl AdkAgentClient {
    pub fn new(base_url: &str, user_id: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
        })
    }

    /// `{user}_{app}_{unix seconds}`, the runtime's session naming scheme
    pub fn session_id_for(&self, agent: &str) -> String {
        format!("{}_{}_{}", self.user_id, agent, Utc::now().timestamp())
    }

    async fn create_session(&self, agent: &str) -> Result<String, GatewayError> {
        let session_id = self.session_id_for(agent);
        let url = format!(
            "{}/apps/{}/users/{}/sessions/{}",
            self.base_url, agent, self.user_id, session_id
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({"state": {}}))
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(agent = %agent, status, "Agent session creation failed");
            return Err(GatewayError::Upstream { status, body });
        }

        debug!(agent = %agent, session_id = %session_id, "Created agent session");
        Ok(session_id)
    }
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

#[async_trait]
impl AgentGateway for AdkAgentClient {
    async fn run(&self, agent: &str, prompt: &str) -> Result<AgentResponse, GatewayError> {
        let started = Instant::now();
        let result = async {
            let session_id = self.create_session(agent).await?;
            let request = RunRequest {
                app_name: agent,
                user_id: &self.user_id,
                session_id: &session_id,
                new_message: NewMessage {
                    role: "user",
                    parts: [TextPart { text: prompt }],
                },
            };

            let response = self
                .client
                .post(format!("{}/run", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(map_transport)?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(GatewayError::Upstream { status, body });
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            AgentResponse::new(body)
        }
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("testgen_agent_calls_total", "agent" => agent.to_string(), "outcome" => outcome)
            .increment(1);
        match &result {
            Ok(_) => info!(agent = %agent, elapsed_ms = started.elapsed().as_millis() as u64, "Agent call completed"),
            Err(e) => error!(agent = %agent, error = %e, "Agent call failed"),
        }
        result
    }

    /// Any HTTP answer below 500 counts as reachable
    async fn health_check(&self) -> Result<(), GatewayError> {
        let response = self
            .client
            .get(format!("{}/list-apps", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_and_base_url_normalisation() {
        let client = AdkAgentClient::new("http://localhost:8000/adk/", "svc", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000/adk");
        assert!(client.session_id_for("sequential_workflow").starts_with("svc_sequential_workflow_"));
    }

    #[test]
    fn test_run_request_shape() {
        let request = RunRequest {
            app_name: "sequential_workflow",
            user_id: "svc",
            session_id: "svc_sequential_workflow_1",
            new_message: NewMessage {
                role: "user",
                parts: [TextPart { text: "hi" }],
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "app_name": "sequential_workflow",
                "user_id": "svc",
                "session_id": "svc_sequential_workflow_1",
                "new_message": {"role": "user", "parts": [{"text": "hi"}]}
            })
        );
    }
}
