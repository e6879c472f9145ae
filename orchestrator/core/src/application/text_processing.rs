// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Text Processing
//!
//! Sentence-aware chunking, requirement extraction and recovery of test cases
//! from free-form agent output.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Pure text helpers shared by the parser, ingestion and generation modules

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::domain::document::{ChunkMetadata, TextChunk};

/// Sentences this short are usually list markers or stray punctuation
const MIN_SENTENCE_CHARS: usize = 10;

/// Rough token estimate used for chunk budgeting (four characters per token)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern"))
}

/// Groups sentences into chunks of at most `chunk_size` tokens, carrying up to
/// `overlap` tokens of trailing sentences into the next chunk.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl SentenceChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn chunk(&self, text: &str, document_id: Option<&str>, source_type: Option<&str>) -> Vec<TextChunk> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for sentence in sentences {
            let tokens = estimate_tokens(sentence);
            if current_tokens + tokens > self.chunk_size && !current.is_empty() {
                chunks.push(self.make_chunk(&current, chunks.len(), document_id, source_type));
                current = self.overlap_tail(&current);
                current.push(sentence);
                current_tokens = current.iter().map(|s| estimate_tokens(s)).sum();
            } else {
                current.push(sentence);
                current_tokens += tokens;
            }
        }

        if !current.is_empty() {
            chunks.push(self.make_chunk(&current, chunks.len(), document_id, source_type));
        }
        chunks
    }

    fn overlap_tail<'a>(&self, sentences: &[&'a str]) -> Vec<&'a str> {
        let mut tail = Vec::new();
        let mut tokens = 0;
        for sentence in sentences.iter().rev() {
            let t = estimate_tokens(sentence);
            if tokens + t > self.overlap {
                break;
            }
            tail.push(*sentence);
            tokens += t;
        }
        tail.reverse();
        tail
    }

    fn make_chunk(
        &self,
        sentences: &[&str],
        index: usize,
        document_id: Option<&str>,
        source_type: Option<&str>,
    ) -> TextChunk {
        let text = sentences.join(" ");
        TextChunk {
            metadata: ChunkMetadata {
                chunk_index: index,
                chunk_length: text.chars().count(),
                token_count: estimate_tokens(&text),
                document_id: document_id.map(str::to_string),
                source_type: source_type.map(str::to_string),
            },
            text,
        }
    }
}

/// Split on whitespace that follows `.`, `!` or `?`, dropping short fragments
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            push_sentence(&text[start..i], &mut sentences);
            while let Some((_, next)) = iter.peek() {
                if next.is_whitespace() {
                    iter.next();
                } else {
                    break;
                }
            }
            start = iter.peek().map(|(j, _)| *j).unwrap_or(text.len());
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    push_sentence(&text[start..], &mut sentences);
    sentences
}

fn push_sentence<'a>(candidate: &'a str, out: &mut Vec<&'a str>) {
    let trimmed = candidate.trim();
    if trimmed.chars().count() > MIN_SENTENCE_CHARS {
        out.push(trimmed);
    }
}

/// Pull requirement statements out of free text.
///
/// Labelled lines (`Requirement:`, `REQ-12:`, bullets, numbered items) win.
/// Without labels, sentences phrased as capabilities or obligations are used,
/// and as a last resort every non-empty line.
pub fn extract_requirements(text: &str, limit: usize) -> Vec<String> {
    static LABELLED: OnceLock<Regex> = OnceLock::new();
    static REQ_ID: OnceLock<Regex> = OnceLock::new();
    static BULLET: OnceLock<Regex> = OnceLock::new();
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    static MODAL: OnceLock<Regex> = OnceLock::new();

    let patterns = [
        regex(&LABELLED, r"(?i)^\s*requirements?\s*:\s*(.+)$"),
        regex(&REQ_ID, r"(?i)^\s*REQ-\d+\s*:\s*(.+)$"),
        regex(&BULLET, r"^\s*[•*\-]\s+(.+)$"),
        regex(&NUMBERED, r"^\s*\d+[.)]\s+(.+)$"),
    ];

    let mut found = Vec::new();
    for line in text.lines() {
        if let Some(caps) = patterns.iter().find_map(|re| re.captures(line)) {
            found.push(caps[1].trim().to_string());
        }
    }

    if found.is_empty() {
        let modal = regex(
            &MODAL,
            r"(?i)\b(shall|must|should|can|will|may|needs? to|is able to|allows?)\b",
        );
        found = text
            .lines()
            .flat_map(|line| sentence_candidates(line))
            .filter(|s| modal.is_match(s))
            .collect();
    }

    if found.is_empty() {
        found = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|r| !r.is_empty() && seen.insert(r.to_lowercase()))
        .take(limit)
        .collect()
}

/// Sentences of one line, keeping short ones (requirements are often terse)
fn sentence_candidates(line: &str) -> Vec<String> {
    line.split_inclusive(['.', '!', '?'])
        .map(|s| s.trim().trim_end_matches(['.', '!', '?']).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalized test case recovered from agent output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTestCase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    pub test_name: String,
    pub test_description: String,
    pub test_steps: Value,
    pub expected_results: String,
    pub test_type: String,
    pub priority: String,
}

/// Recover test cases from agent text.
///
/// Order of attempts: a JSON list, a `{"test_cases": [...]}` object (both also
/// inside fenced code blocks or embedded in prose), then `TC_<CATEGORY>_<n>`
/// identifiers.
pub fn parse_test_cases(text: &str) -> Vec<GeneratedTestCase> {
    for candidate in json_candidates(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            let items = match value {
                Value::Array(items) => items,
                Value::Object(mut map) => match map.remove("test_cases") {
                    Some(Value::Array(items)) => items,
                    _ => continue,
                },
                _ => continue,
            };
            let parsed: Vec<_> = items.iter().filter_map(Value::as_object).map(normalize_test_case).collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }
    }

    static TC_ID: OnceLock<Regex> = OnceLock::new();
    let tc = regex(&TC_ID, r"TC_([A-Za-z0-9]+)_(\d+)");
    let mut seen = HashSet::new();
    tc.captures_iter(text)
        .filter(|caps| seen.insert(caps[0].to_string()))
        .map(|caps| {
            let category = caps[1].to_lowercase();
            let test_type = match category.as_str() {
                "functional" | "security" | "edge" | "negative" => category.clone(),
                "sec" => "security".to_string(),
                _ => "functional".to_string(),
            };
            GeneratedTestCase {
                test_id: Some(caps[0].to_string()),
                test_name: format!("Test Case {}", &caps[0]),
                test_description: format!("Generated test case for {} testing", category),
                test_steps: Value::Array(vec![
                    Value::from("Navigate to application"),
                    Value::from("Perform test action"),
                    Value::from("Verify result"),
                ]),
                expected_results: "Expected behavior should be observed".to_string(),
                test_type,
                priority: if category == "sec" { "high" } else { "medium" }.to_string(),
            }
        })
        .collect()
}

fn json_candidates(text: &str) -> Vec<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = regex(&FENCE, r"(?s)```(?:json)?\s*(.*?)```");

    let mut candidates = vec![text.trim()];
    candidates.extend(fence.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str().trim()));
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if start < end {
                candidates.push(&text[start..=end]);
            }
        }
    }
    candidates
}

fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match map.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Array(items)) if !items.is_empty() => Some(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    })
}

fn normalize_test_case(map: &Map<String, Value>) -> GeneratedTestCase {
    let test_name = first_str(map, &["test_name", "title", "name"]).unwrap_or_else(|| "Generated Test".to_string());
    GeneratedTestCase {
        test_id: first_str(map, &["test_id", "id"]),
        test_description: first_str(map, &["test_description", "description"]).unwrap_or_default(),
        test_steps: map
            .get("test_steps")
            .or_else(|| map.get("steps"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new())),
        expected_results: first_str(map, &["expected_results", "expected_result", "expected"]).unwrap_or_default(),
        test_type: first_str(map, &["test_type", "type"]).unwrap_or_else(|| "functional".to_string()),
        priority: first_str(map, &["priority"]).unwrap_or_else(|| "medium".to_string()),
        test_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_sentences_drops_short_fragments() {
        let sentences = split_sentences("Users can log in with email. Ok. Passwords must be hashed!  Why?");
        assert_eq!(sentences, vec!["Users can log in with email.", "Passwords must be hashed!"]);
    }

    #[test]
    fn test_chunker_respects_budget_and_overlap() {
        // 39 chars, 9 tokens per sentence
        let sentence = "The system records every login attempt.";
        assert_eq!(estimate_tokens(sentence), 9);
        let text = vec![sentence; 10].join(" ");

        let chunker = SentenceChunker::new(30, 10);
        let chunks = chunker.chunk(&text, Some("doc-1"), Some("txt"));

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert!(chunk.metadata.token_count <= 30 + 1);
            assert_eq!(chunk.metadata.document_id.as_deref(), Some("doc-1"));
        }
        // Overlap: every chunk after the first starts with the previous chunk's last sentence.
        assert!(chunks[1].text.starts_with(sentence));
    }

    #[test]
    fn test_chunker_empty_input() {
        assert!(SentenceChunker::default().chunk("   ", None, None).is_empty());
    }

    #[test]
    fn test_plain_sentence_becomes_requirement() {
        assert_eq!(extract_requirements("User can login", 50), vec!["User can login"]);
    }

    #[test]
    fn test_labelled_requirements_take_precedence() {
        let text = "Intro paragraph that should be ignored.\nREQ-1: Users can reset passwords\n- Sessions expire after 30 minutes\nRequirement: Audit all logins";
        let reqs = extract_requirements(text, 10);
        assert_eq!(
            reqs,
            vec![
                "Users can reset passwords",
                "Sessions expire after 30 minutes",
                "Audit all logins"
            ]
        );
    }

    #[test]
    fn test_extraction_dedups_and_caps() {
        let text = "- a thing\n- A THING\n- b\n- c";
        assert_eq!(extract_requirements(text, 2), vec!["a thing", "b"]);
    }

    #[test]
    fn test_parse_json_list_inside_fence() {
        let text = "Here you go:\n```json\n[{\"test_id\": \"TC_LOGIN_001\", \"test_name\": \"Valid login\", \"steps\": [\"open\", \"submit\"], \"expected_result\": \"dashboard\", \"priority\": 1}]\n```";
        let cases = parse_test_cases(text);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].test_name, "Valid login");
        assert_eq!(cases[0].test_steps, json!(["open", "submit"]));
        assert_eq!(cases[0].expected_results, "dashboard");
        assert_eq!(cases[0].priority, "1");
    }

    #[test]
    fn test_parse_wrapped_object() {
        let text = r#"{"test_cases": [{"title": "Lockout", "description": "3 failures lock the account"}]}"#;
        let cases = parse_test_cases(text);
        assert_eq!(cases[0].test_name, "Lockout");
        assert_eq!(cases[0].test_type, "functional");
    }

    #[test]
    fn test_parse_tc_pattern_fallback() {
        let cases = parse_test_cases("TC_SEC_001 covers injection; TC_FUNCTIONAL_002 and TC_SEC_001 again");
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].test_type, "security");
        assert_eq!(cases[0].priority, "high");
        assert_eq!(cases[1].test_type, "functional");
    }

    #[test]
    fn test_parse_nothing() {
        assert!(parse_test_cases("no structured output here").is_empty());
    }
}
