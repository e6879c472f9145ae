// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::AppState;
use crate::application::HealthStatus;

/// 200 when every adapter answers, 503 with per-component detail otherwise
pub(super) async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.services.health().await;
    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status,
        Json(json!({
            "status": report.status,
            "service": "testgen",
            "version": env!("CARGO_PKG_VERSION"),
            "modules": state.modules.len(),
            "components": report.components,
            "timestamp": Utc::now(),
        })),
    )
}
