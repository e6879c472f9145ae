// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::application::ServiceError;

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            debug!(kind = self.kind(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, turning axum's rejection into a validation failure
pub(super) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

/// Merge a route-level `operation` into a JSON object body
pub(super) fn with_operation(body: Value, operation: &str) -> Result<Value, ServiceError> {
    let mut object = match body {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        _ => {
            return Err(ServiceError::Validation(
                "Request body must be a JSON object".to_string(),
            ))
        }
    };
    object.insert("operation".to_string(), Value::String(operation.to_string()));
    Ok(Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_error_body_carries_kind_and_message() {
        let response = ServiceError::NotFound("Session 'x' not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "NotFound");
        assert_eq!(body.message, "Session 'x' not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::Validation(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::Upstream(String::new()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ServiceError::Internal(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_route_operation_overrides_body() {
        let merged = with_operation(json!({"operation": "report", "story_id": 7}), "link").unwrap();
        assert_eq!(merged, json!({"operation": "link", "story_id": 7}));

        assert_eq!(with_operation(Value::Null, "report").unwrap(), json!({"operation": "report"}));
        assert!(with_operation(json!([1, 2]), "report").is_err());
    }
}
