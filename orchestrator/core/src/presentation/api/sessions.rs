// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::json_body;
use super::AppState;
use crate::application::{sessions, ServiceError};
use crate::domain::session::SessionId;

type ApiResult = Result<Json<Value>, ServiceError>;

#[derive(Debug, Deserialize)]
pub(super) struct CreateSessionRequest {
    user_id: String,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    user_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RequirementContent {
    content: String,
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

pub(super) async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(body)?;
    if request.user_id.trim().is_empty() {
        return Err(ServiceError::Validation("user_id is required".to_string()));
    }
    let session = sessions::create_session(
        &state.services,
        request.user_id.trim(),
        request.project_name,
        request.user_prompt,
    )
    .await?;
    Ok(Json(json!({
        "status": "created",
        "session_id": session.session_id,
        "session": session,
    })))
}

pub(super) async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::get_session(&state.services, &SessionId::new(id)).await?))
}

pub(super) async fn list_user_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult {
    Ok(Json(sessions::list_user_sessions(&state.services, &user_id).await?))
}

pub(super) async fn list_requirements(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::list_requirements(&state.services, &SessionId::new(id)).await?))
}

pub(super) async fn add_requirement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<RequirementContent>, JsonRejection>,
) -> ApiResult {
    let request = json_body(body)?;
    let requirement = sessions::add_requirement(&state.services, &SessionId::new(id), &request.content).await?;
    to_json(&requirement)
}

pub(super) async fn update_requirement(
    State(state): State<Arc<AppState>>,
    Path((id, requirement_id)): Path<(String, String)>,
    body: Result<Json<RequirementContent>, JsonRejection>,
) -> ApiResult {
    let request = json_body(body)?;
    let requirement =
        sessions::update_requirement(&state.services, &SessionId::new(id), &requirement_id, &request.content).await?;
    to_json(&requirement)
}

pub(super) async fn delete_requirement(
    State(state): State<Arc<AppState>>,
    Path((id, requirement_id)): Path<(String, String)>,
) -> ApiResult {
    Ok(Json(
        sessions::delete_requirement(&state.services, &SessionId::new(id), &requirement_id).await?,
    ))
}

pub(super) async fn regenerate_for_requirement(
    State(state): State<Arc<AppState>>,
    Path((id, requirement_id)): Path<(String, String)>,
) -> ApiResult {
    Ok(Json(
        sessions::regenerate_for_requirement(&state.services, &SessionId::new(id), &requirement_id).await?,
    ))
}

pub(super) async fn regenerate_all(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::regenerate_all(&state.services, &SessionId::new(id)).await?))
}

pub(super) async fn list_test_cases(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::list_test_cases(&state.services, &SessionId::new(id)).await?))
}

pub(super) async fn coverage_report(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::coverage_report(&state.services, &SessionId::new(id)).await?))
}

pub(super) async fn analytics(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::analytics(&state.services, &SessionId::new(id)).await?))
}

pub(super) async fn export(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Json(sessions::export(&state.services, &SessionId::new(id)).await?))
}
