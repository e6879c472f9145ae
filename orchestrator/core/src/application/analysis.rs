// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Direct agent calls that are not business modules: requirement analysis and
//! the agent runtime diagnosis.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::application::error::ServiceError;
use crate::application::services::ServiceRegistry;
use crate::domain::agent::{REQUIREMENT_ANALYZER, SEQUENTIAL_WORKFLOW};
use crate::domain::generation::RequirementAnalysisRequest;

const DIAGNOSTIC_PROMPT: &str = "Hello, please respond with a brief status message.";

/// Validate, then forward the requirements to the analyzer agent. The agent
/// output is returned unchanged under `agent_response`.
pub async fn analyze_requirements(
    services: &ServiceRegistry,
    request: RequirementAnalysisRequest,
) -> Result<Value, ServiceError> {
    request.validate()?;

    let depth = request
        .analysis_depth
        .clone()
        .unwrap_or_else(|| services.settings.analysis_depth.clone());
    let prompt = request.to_prompt(&services.settings.analysis_depth);
    let response = services.agent.run(REQUIREMENT_ANALYZER, &prompt).await?;

    info!(depth = %depth, "Requirement analysis completed");
    Ok(json!({
        "status": "success",
        "agent": REQUIREMENT_ANALYZER,
        "analysis_depth": depth,
        "analysis": response.text(),
        "agent_response": response.into_value(),
    }))
}

/// Step through reachability and a short conversation with the default
/// workflow agent, reporting each check separately.
pub async fn diagnose(services: &ServiceRegistry) -> Value {
    let mut checks = serde_json::Map::new();

    let reachable = match services.agent.health_check().await {
        Ok(()) => {
            checks.insert("agent_reachable".into(), json!({"status": "pass"}));
            true
        }
        Err(e) => {
            checks.insert("agent_reachable".into(), json!({"status": "fail", "details": e.to_string()}));
            false
        }
    };

    let overall = if !reachable {
        checks.insert(
            "agent_communication".into(),
            json!({"status": "skipped", "details": "agent runtime is not reachable"}),
        );
        "agent_unreachable"
    } else {
        match services.agent.run(SEQUENTIAL_WORKFLOW, DIAGNOSTIC_PROMPT).await {
            Ok(response) => {
                checks.insert(
                    "agent_communication".into(),
                    json!({"status": "pass", "details": response.text()}),
                );
                "healthy"
            }
            Err(e) => {
                checks.insert(
                    "agent_communication".into(),
                    json!({"status": "fail", "details": e.to_string()}),
                );
                "partially_working"
            }
        }
    };

    json!({
        "timestamp": Utc::now(),
        "agent": SEQUENTIAL_WORKFLOW,
        "overall_status": overall,
        "checks": checks,
    })
}
