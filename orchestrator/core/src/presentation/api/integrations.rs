// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ALM and traceability operations. The path segment names the operation;
//! the body carries its arguments.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::error::with_operation;
use super::AppState;
use crate::application::modules::{alm_integration, traceability};
use crate::application::ServiceError;
use crate::domain::module::ModuleId;

async fn run_operation(
    state: &AppState,
    module: &str,
    operation: &str,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    // An empty body is allowed for argument-free operations such as `report`
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::Validation(format!("Invalid JSON body: {}", e)))?
    };
    let payload = with_operation(body, &operation.replace('-', "_"))?;
    Ok(Json(state.modules.invoke(&ModuleId::new(module), payload).await?))
}

pub(super) async fn alm_operation(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    run_operation(&state, alm_integration::ID, &operation, body).await
}

pub(super) async fn traceability_operation(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    run_operation(&state, traceability::ID, &operation, body).await
}
