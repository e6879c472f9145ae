// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Document Text Extraction
//!
//! Turns uploaded file bytes into plain text. Blocking; callers run it on
//! `spawn_blocking`.
//!
//! | Type | Method |
//! |---|---|
//! | txt | UTF-8, falling back to Windows-1252 |
//! | xml | as txt, then tags stripped |
//! | pdf | `pdf-extract` |
//! | docx | `word/document.xml` text runs, one line per paragraph |

use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::LazyLock;
use thiserror::Error;

use crate::domain::document::FileType;

static XML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid regex pattern"));

static DOCX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|</w:p>|<w:tab/>|<w:br/>").expect("Invalid regex pattern")
});

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("File type '{0}' cannot be converted to text")]
    Unsupported(FileType),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX: {0}")]
    Docx(String),
}

pub fn extract_text(file_type: FileType, bytes: &[u8]) -> Result<String, ExtractionError> {
    match file_type {
        FileType::Txt => Ok(decode_text(bytes)),
        FileType::Xml => Ok(strip_xml(&decode_text(bytes))),
        FileType::Pdf => pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string())),
        FileType::Docx => extract_docx(bytes),
        other => Err(ExtractionError::Unsupported(other)),
    }
}

/// UTF-8 (BOM tolerated) or Windows-1252
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

fn strip_xml(xml: &str) -> String {
    let text = XML_TAG.replace_all(xml, " ");
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(e.to_string()))?
        .read_to_string(&mut document)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut out = String::new();
    for token in DOCX_TOKEN.captures_iter(&document) {
        match token.get(1) {
            Some(run) => out.push_str(&unescape_xml(run.as_str())),
            None => match &token[0] {
                "<w:tab/>" => out.push('\t'),
                _ => out.push('\n'),
            },
        }
    }

    Ok(out
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_txt_falls_back_to_windows_1252() {
        assert_eq!(extract_text(FileType::Txt, b"User can login").unwrap(), "User can login");
        assert_eq!(extract_text(FileType::Txt, b"\xEF\xBB\xBFhello").unwrap(), "hello");
        // 0xE9 is "é" in Windows-1252 and invalid on its own in UTF-8
        assert_eq!(extract_text(FileType::Txt, b"caf\xE9").unwrap(), "café");
    }

    #[test]
    fn test_xml_tags_are_stripped() {
        let xml = b"<reqs>\n  <req id=\"1\">The system shall log in users</req>\n  <req>Reports <b>must</b> export</req>\n</reqs>";
        assert_eq!(
            extract_text(FileType::Xml, xml).unwrap(),
            "The system shall log in users\nReports must export"
        );
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let bytes = docx(
            r#"<w:document><w:body><w:p><w:r><w:t>The system shall </w:t></w:r><w:r><w:t xml:space="preserve">log in users &amp; admins</w:t></w:r></w:p><w:p><w:r><w:t>REQ-2: export</w:t></w:r></w:p></w:body></w:document>"#,
        );
        assert_eq!(
            extract_text(FileType::Docx, &bytes).unwrap(),
            "The system shall log in users & admins\nREQ-2: export"
        );
    }

    #[test]
    fn test_broken_inputs_are_errors() {
        assert!(matches!(extract_text(FileType::Docx, b"not a zip"), Err(ExtractionError::Docx(_))));
        assert!(matches!(extract_text(FileType::Pdf, b"not a pdf"), Err(ExtractionError::Pdf(_))));
        assert!(matches!(extract_text(FileType::Xlsx, b""), Err(ExtractionError::Unsupported(FileType::Xlsx))));
    }
}
