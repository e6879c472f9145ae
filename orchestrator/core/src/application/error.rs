// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service Error Taxonomy
//!
//! Every failure that reaches a controller is one of four kinds. Lower layers
//! keep their own error enums; the `From` impls here decide which kind each
//! of their variants belongs to.

use thiserror::Error;

use crate::domain::agent::GatewayError;
use crate::domain::alm::AlmError;
use crate::domain::generation::RequestValidationError;
use crate::domain::module::ModuleError;
use crate::domain::stores::AdapterError;
use crate::domain::traceability::TraceabilityError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// Unknown module or identifier
    #[error("{0}")]
    NotFound(String),

    /// External database, cache, vector, ALM or agent failure
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "ValidationFailure",
            ServiceError::NotFound(_) => "NotFound",
            ServiceError::Upstream(_) => "UpstreamFailure",
            ServiceError::Internal(_) => "InternalFailure",
        }
    }
}

impl From<RequestValidationError> for ServiceError {
    fn from(err: RequestValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        ServiceError::Upstream(format!("Agent gateway failure: {}", err))
    }
}

impl From<AdapterError> for ServiceError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

impl From<AlmError> for ServiceError {
    fn from(err: AlmError) -> Self {
        match err {
            AlmError::NotConfigured => ServiceError::NotFound(err.to_string()),
            AlmError::NotFound(_) => ServiceError::NotFound(err.to_string()),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

impl From<TraceabilityError> for ServiceError {
    fn from(err: TraceabilityError) -> Self {
        ServiceError::NotFound(err.to_string())
    }
}

impl From<ModuleError> for ServiceError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::InvalidInput(msg) => ServiceError::Validation(msg),
            ModuleError::NotFound(msg) => ServiceError::NotFound(msg),
            ModuleError::Gateway(e) => e.into(),
            ModuleError::Adapter(e) => e.into(),
            ModuleError::Alm(e) => e.into(),
            ModuleError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_failures_classify_as_upstream() {
        let err: ServiceError = ModuleError::Gateway(GatewayError::Timeout("300s".into())).into();
        assert_eq!(err.kind(), "UpstreamFailure");

        let err: ServiceError = AdapterError::ConnectionFailure("refused".into()).into();
        assert_eq!(err.kind(), "UpstreamFailure");
    }

    #[test]
    fn test_not_found_survives_module_wrapping() {
        let err: ServiceError = ModuleError::Adapter(AdapterError::NotFound("session x".into())).into();
        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "session x"));

        let err: ServiceError = AlmError::NotConfigured.into();
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn test_invalid_module_input_is_validation() {
        let err: ServiceError = ModuleError::InvalidInput("top_k".into()).into();
        assert_eq!(err.kind(), "ValidationFailure");
    }
}
