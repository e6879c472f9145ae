// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Multipart upload handlers and document status.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::AppState;
use crate::application::documents::{self, UploadOptions, UploadedFile};
use crate::application::ServiceError;

#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn flag(&self, name: &str, default: bool) -> bool {
        match self.fields.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
            _ => default,
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn options(&self) -> UploadOptions {
        UploadOptions {
            document_id: self.text("document_id"),
            extract_requirements: self.flag("extract_requirements", true),
            ingest: self.flag("ingest", false),
            document_type: self.text("document_type"),
        }
    }
}

fn multipart_error(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(format!("Invalid multipart body: {}", err))
}

/// `file`/`files` parts become uploads, every other part a text field
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ServiceError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" || name == "files" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.files.push(UploadedFile {
                filename,
                content_type,
                bytes,
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

pub(super) async fn parse_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ServiceError> {
    let mut form = read_form(multipart).await?;
    let options = form.options();
    let file = match form.files.len() {
        0 => return Err(ServiceError::Validation("No file provided".to_string())),
        1 => form.files.remove(0),
        n => {
            return Err(ServiceError::Validation(format!(
                "Expected one file, got {}; use /api/documents/upload-batch",
                n
            )))
        }
    };

    let result = documents::process_file(&state.services, &state.modules, file, &options).await?;
    Ok(Json(result))
}

pub(super) async fn upload_batch(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ServiceError> {
    let form = read_form(multipart).await?;
    let options = form.options();
    let batch_id = form.text("batch_id");

    let result = documents::process_batch(&state.services, &state.modules, form.files, batch_id, &options).await?;
    Ok(Json(result))
}

pub(super) async fn supported_types(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(documents::supported_types(&state.services))
}

pub(super) async fn document_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    Ok(Json(documents::document_status(&state.services, &id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            files: Vec::new(),
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn test_upload_options_from_form_fields() {
        let options = form(&[
            ("extract_requirements", "false"),
            ("ingest", "TRUE"),
            ("document_id", "  "),
            ("document_type", "requirements"),
        ])
        .options();

        assert!(!options.extract_requirements);
        assert!(options.ingest);
        assert_eq!(options.document_id, None);
        assert_eq!(options.document_type.as_deref(), Some("requirements"));
    }

    #[test]
    fn test_unrecognised_flags_keep_defaults() {
        let options = form(&[("extract_requirements", "maybe")]).options();
        assert!(options.extract_requirements);
        assert!(!options.ingest);
    }
}
