// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document parser module: lines, sentence chunks and extracted requirements.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::application::services::ServiceSettings;
use crate::application::text_processing::{extract_requirements, SentenceChunker};
use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};

pub const ID: &str = "document_parser";

const DEFAULT_MAX_REQUIREMENTS: usize = 50;

#[derive(Debug, Deserialize)]
struct ParseInput {
    content: String,
    #[serde(default)]
    options: ParseOptions,
}

#[derive(Debug, Default, Deserialize)]
struct ParseOptions {
    #[serde(default)]
    extract_requirements: bool,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    max_requirements: Option<usize>,
    document_id: Option<String>,
    source_type: Option<String>,
}

pub struct DocumentParserModule {
    descriptor: ModuleDescriptor,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentParserModule {
    pub fn new(settings: &ServiceSettings) -> Self {
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "Document Parser".to_string(),
                description: "Splits raw text into lines and sentence-aware chunks and optionally extracts requirement statements".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["content"],
                    "properties": {
                        "content": {"type": "string", "minLength": 1},
                        "options": {
                            "type": "object",
                            "properties": {
                                "extract_requirements": {"type": "boolean"},
                                "chunk_size": {"type": "integer", "minimum": 1},
                                "chunk_overlap": {"type": "integer", "minimum": 0},
                                "max_requirements": {"type": "integer", "minimum": 1, "maximum": 500},
                                "document_id": {"type": "string"},
                                "source_type": {"type": "string"}
                            }
                        }
                    }
                }),
                output_schema: json!({
                    "type": "object",
                    "required": ["lines", "chunks", "chunks_created"],
                    "properties": {
                        "lines": {"type": "array", "items": {"type": "string"}},
                        "chunks": {"type": "array"},
                        "chunks_created": {"type": "integer"},
                        "requirements": {"type": "array", "items": {"type": "string"}},
                        "line_count": {"type": "integer"},
                        "char_count": {"type": "integer"}
                    }
                }),
            },
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

#[async_trait]
impl BusinessModule for DocumentParserModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        let input: ParseInput = serde_json::from_value(payload)?;
        let options = input.options;

        let chunk_size = options.chunk_size.unwrap_or(self.chunk_size);
        let chunk_overlap = options.chunk_overlap.unwrap_or(self.chunk_overlap);
        if chunk_overlap >= chunk_size {
            return Err(ModuleError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let lines: Vec<&str> = input.content.lines().collect();
        let chunks = SentenceChunker::new(chunk_size, chunk_overlap).chunk(
            &input.content,
            options.document_id.as_deref(),
            options.source_type.as_deref(),
        );

        let mut output = json!({
            "lines": lines,
            "line_count": lines.len(),
            "char_count": input.content.chars().count(),
            "chunks_created": chunks.len(),
            "chunks": chunks,
        });

        if options.extract_requirements {
            let limit = options.max_requirements.unwrap_or(DEFAULT_MAX_REQUIREMENTS);
            output["requirements"] = json!(extract_requirements(&input.content, limit));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_sentence_yields_requirement() {
        let module = DocumentParserModule::new(&ServiceSettings::default());
        let out = module
            .run(json!({"content": "User can login", "options": {"extract_requirements": true}}))
            .await
            .unwrap();

        assert_eq!(out["lines"], json!(["User can login"]));
        assert_eq!(out["requirements"], json!(["User can login"]));
        assert_eq!(out["chunks_created"], 1);
    }

    #[tokio::test]
    async fn test_requirements_omitted_unless_requested() {
        let module = DocumentParserModule::new(&ServiceSettings::default());
        let out = module.run(json!({"content": "User can login"})).await.unwrap();
        assert!(out.get("requirements").is_none());
    }

    #[tokio::test]
    async fn test_overlap_must_be_smaller_than_chunk() {
        let module = DocumentParserModule::new(&ServiceSettings::default());
        let err = module
            .run(json!({"content": "text", "options": {"chunk_size": 10, "chunk_overlap": 10}}))
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::InvalidInput(_)));
    }
}
