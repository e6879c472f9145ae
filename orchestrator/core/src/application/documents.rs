// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document Upload Use Cases
//!
//! Turns uploaded files into text, runs the document parser module on it and
//! optionally ingests the resulting chunks into the vector index. Every upload
//! gets a [`DocumentRecord`] in the document store so its status can be polled.

use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::modules::{data_ingestion, document_parser};
use crate::application::registry::ModuleRegistry;
use crate::application::services::ServiceRegistry;
use crate::domain::document::{determine_file_type, DocumentRecord, FileType, DOCUMENTS_COLLECTION};
use crate::domain::module::ModuleId;
use crate::infrastructure::document_extractor;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub document_id: Option<String>,
    pub extract_requirements: bool,
    /// Also embed the chunks into the vector index
    pub ingest: bool,
    /// `document_type` metadata on ingested vectors (requirements, test_specs, ...)
    pub document_type: Option<String>,
}

pub fn supported_types(services: &ServiceRegistry) -> Value {
    let supported: Vec<FileType> = FileType::ALL.into_iter().filter(FileType::is_supported).collect();
    json!({
        "supported_extensions": supported.iter().map(|t| format!(".{}", t)).collect::<Vec<_>>(),
        "supported_types": supported,
        "recognised_types": FileType::ALL,
        "max_file_size_bytes": services.settings.max_file_size_bytes,
        "batch_limit": services.settings.max_batch_files,
    })
}

pub async fn document_status(services: &ServiceRegistry, document_id: &str) -> Result<Value, ServiceError> {
    services
        .documents
        .get(DOCUMENTS_COLLECTION, document_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Document '{}' not found", document_id)))
}

fn check_file(services: &ServiceRegistry, file: &UploadedFile) -> Result<FileType, ServiceError> {
    if file.filename.trim().is_empty() {
        return Err(ServiceError::Validation("No filename provided".to_string()));
    }
    let limit = services.settings.max_file_size_bytes;
    if file.bytes.len() > limit {
        return Err(ServiceError::Validation(format!(
            "File '{}' is {} bytes; the limit is {} bytes",
            file.filename,
            file.bytes.len(),
            limit
        )));
    }
    match determine_file_type(&file.filename, file.content_type.as_deref()) {
        Some(file_type) if file_type.is_supported() => Ok(file_type),
        Some(file_type) => Err(ServiceError::Validation(format!(
            "File type '{}' is recognised but cannot be processed",
            file_type
        ))),
        None => Err(ServiceError::Validation(format!(
            "Unsupported file type: {}",
            file.filename
        ))),
    }
}

/// Extract, parse and optionally ingest one file
pub async fn process_file(
    services: &ServiceRegistry,
    modules: &ModuleRegistry,
    file: UploadedFile,
    options: &UploadOptions,
) -> Result<Value, ServiceError> {
    let file_type = check_file(services, &file)?;
    let document_id = options
        .document_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut record = DocumentRecord::processing(&document_id, &file.filename, file.bytes.len());
    record.file_type = Some(file_type);
    save_record(services, &record).await?;

    match parse_and_ingest(modules, &file, file_type, &document_id, options).await {
        Ok((content, parsed, ingestion)) => {
            let chunks_created = parsed["chunks_created"].as_u64().unwrap_or(0) as usize;
            record.complete(chunks_created);
            save_record(services, &record).await?;
            info!(document_id = %document_id, file_type = %file_type, chunks = chunks_created, "Processed document");

            Ok(json!({
                "status": "success",
                "document_id": document_id,
                "file_type": file_type,
                "original_filename": file.filename,
                "content": content,
                "processing_result": parsed,
                "ingestion": ingestion,
                "message": format!("Document processed successfully with {} chunks", chunks_created),
            }))
        }
        Err(e) => {
            warn!(document_id = %document_id, error = %e, "Document processing failed");
            record.fail(e.to_string());
            if let Err(save_err) = save_record(services, &record).await {
                warn!(document_id = %document_id, error = %save_err, "Could not record document failure");
            }
            Err(e)
        }
    }
}

/// Process up to `max_batch_files` files; per-file failures are reported in
/// the result instead of failing the batch
pub async fn process_batch(
    services: &ServiceRegistry,
    modules: &ModuleRegistry,
    files: Vec<UploadedFile>,
    batch_id: Option<String>,
    options: &UploadOptions,
) -> Result<Value, ServiceError> {
    if files.is_empty() {
        return Err(ServiceError::Validation("No files provided".to_string()));
    }
    let limit = services.settings.max_batch_files;
    if files.len() > limit {
        return Err(ServiceError::Validation(format!(
            "Batch contains {} files; the limit is {}",
            files.len(),
            limit
        )));
    }

    let batch_id = batch_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let total_files = files.len();
    let mut results = Vec::with_capacity(total_files);
    for (index, file) in files.into_iter().enumerate() {
        let filename = file.filename.clone();
        let file_options = UploadOptions {
            document_id: Some(format!("{}_{}", batch_id, index)),
            ..options.clone()
        };
        match process_file(services, modules, file, &file_options).await {
            Ok(out) => results.push(json!({
                "filename": filename,
                "document_id": out["document_id"],
                "status": "success",
                "chunks_created": out["processing_result"]["chunks_created"],
                "content": out["content"],
            })),
            Err(e) => results.push(json!({
                "filename": filename,
                "status": "error",
                "error": e.to_string(),
            })),
        }
    }

    let successful = results.iter().filter(|r| r["status"] == "success").count();
    Ok(json!({
        "batch_id": batch_id,
        "total_files": total_files,
        "successful": successful,
        "failed": total_files - successful,
        "results": results,
    }))
}

async fn save_record(services: &ServiceRegistry, record: &DocumentRecord) -> Result<(), ServiceError> {
    let body = serde_json::to_value(record).map_err(|e| ServiceError::Internal(e.to_string()))?;
    services
        .documents
        .put(DOCUMENTS_COLLECTION, &record.document_id, &body)
        .await?;
    Ok(())
}

async fn parse_and_ingest(
    modules: &ModuleRegistry,
    file: &UploadedFile,
    file_type: FileType,
    document_id: &str,
    options: &UploadOptions,
) -> Result<(String, Value, Value), ServiceError> {
    let bytes = file.bytes.clone();
    let content = tokio::task::spawn_blocking(move || document_extractor::extract_text(file_type, &bytes))
        .await
        .map_err(|e| ServiceError::Internal(format!("text extraction task failed: {}", e)))?
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    if content.trim().is_empty() {
        return Err(ServiceError::Validation(format!(
            "No text could be extracted from '{}'",
            file.filename
        )));
    }

    let parsed = modules
        .invoke(
            &ModuleId::new(document_parser::ID),
            json!({
                "content": content,
                "options": {
                    "extract_requirements": options.extract_requirements,
                    "document_id": document_id,
                    "source_type": file_type.extension(),
                }
            }),
        )
        .await?;

    let texts: Vec<Value> = parsed["chunks"]
        .as_array()
        .map(|chunks| chunks.iter().map(|c| c["text"].clone()).collect())
        .unwrap_or_default();

    let ingestion = if options.ingest && !texts.is_empty() {
        modules
            .invoke(
                &ModuleId::new(data_ingestion::ID),
                json!({
                    "operation": "embed_and_store",
                    "document_id": document_id,
                    "texts": texts,
                    "metadata": {
                        "document_type": options.document_type.as_deref().unwrap_or("general"),
                        "filename": file.filename,
                        "file_type": file_type.extension(),
                    }
                }),
            )
            .await?
    } else {
        Value::Null
    };

    Ok((content, parsed, ingestion))
}
