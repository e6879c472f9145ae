// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::error::json_body;
use super::AppState;
use crate::application::analysis;
use crate::application::modules::test_generation;
use crate::application::ServiceError;
use crate::domain::generation::{RequirementAnalysisRequest, TestGenerationRequest};
use crate::domain::module::ModuleId;

/// Requests that fail validation are rejected before the agent is contacted
pub(super) async fn generate_test_cases(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TestGenerationRequest>, JsonRejection>,
) -> Result<Json<Value>, ServiceError> {
    let request = json_body(body)?;
    request.validate()?;

    let payload = serde_json::to_value(&request).map_err(|e| ServiceError::Internal(e.to_string()))?;
    let result = state
        .modules
        .invoke(&ModuleId::new(test_generation::ID), payload)
        .await?;
    Ok(Json(result))
}

pub(super) async fn analyze_requirements(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RequirementAnalysisRequest>, JsonRejection>,
) -> Result<Json<Value>, ServiceError> {
    let request = json_body(body)?;
    Ok(Json(analysis::analyze_requirements(&state.services, request).await?))
}

pub(super) async fn diagnose(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(analysis::diagnose(&state.services).await)
}
