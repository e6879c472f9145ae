// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! axum router over the module registry and the session use cases. Handlers
//! only map requests to use case calls and [`ServiceError`] to status codes.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** REST surface of the controller service
//!
//! [`ServiceError`]: crate::application::ServiceError

mod adk;
mod documents;
mod error;
mod health;
mod integrations;
mod modules;
mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::{ModuleRegistry, ServiceRegistry};

pub use error::ErrorBody;

/// Extra room on top of the file payloads for multipart framing and text fields
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub struct AppState {
    pub services: ServiceRegistry,
    pub modules: ModuleRegistry,
}

impl AppState {
    pub fn new(services: ServiceRegistry, modules: ModuleRegistry) -> Self {
        Self { services, modules }
    }

    fn body_limit(&self) -> usize {
        let settings = &self.services.settings;
        settings
            .max_file_size_bytes
            .saturating_mul(settings.max_batch_files.max(1))
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .route("/health", get(health::health))
        // Isolated module testing
        .route("/api/test/modules/info", get(modules::modules_info))
        .route("/api/test/modules/{id}/invoke", post(modules::invoke_module))
        .route("/api/test/document-parser/parse-text", post(modules::parse_text))
        .route("/api/test/document-parser/parse-file", post(documents::parse_file))
        .route("/api/test/data-ingestion/embed-and-store", post(modules::embed_and_store))
        .route("/api/test/data-ingestion/query-vectors", post(modules::query_vectors))
        .route("/api/test/domain-tuning/context", post(modules::domain_context))
        .route("/api/test/software-tuning/profile", post(modules::software_profile))
        // Documents
        .route("/api/documents/supported-types", get(documents::supported_types))
        .route("/api/documents/status/{id}", get(documents::document_status))
        .route("/api/documents/upload-batch", post(documents::upload_batch))
        // Agent runtime
        .route("/api/adk/generate-test-cases", post(adk::generate_test_cases))
        .route("/api/adk/analyze-requirements", post(adk::analyze_requirements))
        .route("/api/adk/diagnose", get(adk::diagnose))
        // Sessions
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/{id}", get(sessions::get_session))
        .route("/api/users/{user_id}/sessions", get(sessions::list_user_sessions))
        .route(
            "/api/sessions/{id}/requirements",
            get(sessions::list_requirements).post(sessions::add_requirement),
        )
        .route(
            "/api/sessions/{id}/requirements/{req_id}",
            put(sessions::update_requirement).delete(sessions::delete_requirement),
        )
        .route(
            "/api/sessions/{id}/requirements/{req_id}/regenerate",
            post(sessions::regenerate_for_requirement),
        )
        .route("/api/sessions/{id}/regenerate", post(sessions::regenerate_all))
        .route("/api/sessions/{id}/test-cases", get(sessions::list_test_cases))
        .route("/api/sessions/{id}/coverage-report", get(sessions::coverage_report))
        .route("/api/sessions/{id}/analytics", get(sessions::analytics))
        .route("/api/sessions/{id}/export", get(sessions::export))
        // ALM and traceability
        .route("/api/alm/{operation}", post(integrations::alm_operation))
        .route("/api/traceability/{operation}", post(integrations::traceability_operation))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
