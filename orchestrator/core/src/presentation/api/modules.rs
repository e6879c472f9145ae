// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `/api/test/*` handlers: each business module invoked in isolation.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::{json_body, with_operation};
use super::AppState;
use crate::application::modules::{data_ingestion, document_parser, domain_tuning, software_tuning};
use crate::application::ServiceError;
use crate::domain::module::ModuleId;

type ApiResult = Result<Json<Value>, ServiceError>;

async fn run_module(state: &AppState, id: &str, payload: Value) -> ApiResult {
    let module_id = ModuleId::new(id);
    let result = state.modules.invoke(&module_id, payload).await?;
    Ok(Json(json!({
        "status": "success",
        "module": module_id,
        "result": result,
    })))
}

pub(super) async fn modules_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let modules = state.modules.list();
    Json(json!({
        "total_modules": modules.len(),
        "modules": modules,
    }))
}

pub(super) async fn invoke_module(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    run_module(&state, &id, json_body(body)?).await
}

pub(super) async fn parse_text(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    run_module(&state, document_parser::ID, json_body(body)?).await
}

pub(super) async fn embed_and_store(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let payload = with_operation(json_body(body)?, "embed_and_store")?;
    run_module(&state, data_ingestion::ID, payload).await
}

pub(super) async fn query_vectors(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let payload = with_operation(json_body(body)?, "query_vectors")?;
    run_module(&state, data_ingestion::ID, payload).await
}

pub(super) async fn domain_context(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    run_module(&state, domain_tuning::ID, json_body(body)?).await
}

pub(super) async fn software_profile(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    run_module(&state, software_tuning::ID, json_body(body)?).await
}
