// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document
//!
//! Uploaded document types, processing status records and text chunks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DOCUMENTS_COLLECTION: &str = "documents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Doc,
    Xml,
    Txt,
    Xlsx,
    Xls,
    Pptx,
    Ppt,
}

impl FileType {
    pub const ALL: [FileType; 9] = [
        FileType::Pdf,
        FileType::Docx,
        FileType::Doc,
        FileType::Xml,
        FileType::Txt,
        FileType::Xlsx,
        FileType::Xls,
        FileType::Pptx,
        FileType::Ppt,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Doc => "doc",
            FileType::Xml => "xml",
            FileType::Txt => "txt",
            FileType::Xlsx => "xlsx",
            FileType::Xls => "xls",
            FileType::Pptx => "pptx",
            FileType::Ppt => "ppt",
        }
    }

    /// Types the extractor can actually turn into text
    pub fn is_supported(&self) -> bool {
        matches!(self, FileType::Pdf | FileType::Docx | FileType::Xml | FileType::Txt)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.extension() == ext)
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Some(FileType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some(FileType::Docx),
            "application/msword" => Some(FileType::Doc),
            "text/xml" | "application/xml" => Some(FileType::Xml),
            "text/plain" => Some(FileType::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Determine the file type from the filename extension, falling back to the content type
pub fn determine_file_type(filename: &str, content_type: Option<&str>) -> Option<FileType> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(FileType::from_extension)
        .or_else(|| content_type.and_then(FileType::from_content_type))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Error,
}

/// Processing record kept in the document store for every upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub filename: String,
    pub file_type: Option<FileType>,
    pub status: DocumentStatus,
    pub size_bytes: usize,
    pub chunks_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn processing(document_id: impl Into<String>, filename: impl Into<String>, size_bytes: usize) -> Self {
        let now = Utc::now();
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            file_type: None,
            status: DocumentStatus::Processing,
            size_bytes,
            chunks_created: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn complete(&mut self, chunks_created: usize) {
        self.status = DocumentStatus::Completed;
        self.chunks_created = chunks_created;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = DocumentStatus::Error;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_index: usize,
    pub chunk_length: usize,
    pub token_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}
