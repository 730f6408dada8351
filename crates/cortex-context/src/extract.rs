// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Side-effect extractors run on every context update.
//!
//! Each extractor reads one exchange and mutates the context data on its own;
//! none depends on another having run.

use std::sync::LazyLock;

use chrono::Utc;
use cortex_core::{ContextData, Request, Response};
use regex::Regex;
use serde_json::{Value, json};

/// Derives durable facts about a session from a request/response pair.
pub trait ContextExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, request: &Request, response: &Response, data: &mut ContextData);
}

/// Default extractor set: preferences, knowledge topics, and entities.
pub fn default_extractors() -> Vec<Box<dyn ContextExtractor>> {
    vec![
        Box::new(PreferenceExtractor),
        Box::new(KnowledgeExtractor),
        Box::new(EntityExtractor),
    ]
}

/// Preference statements, keyed by the preference they set.
static PREFERENCE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "language",
            Regex::new(
                r"(?i)\b(?:prefer|use|using|write it in|written in)\s+(rust|python|typescript|javascript|go|java|kotlin|swift|ruby|c\+\+|c#)(?:\W|$)",
            )
            .unwrap(),
        ),
        (
            "indentation",
            Regex::new(r"(?i)\bprefer\s+(tabs|spaces)\b").unwrap(),
        ),
        (
            "verbosity",
            Regex::new(r"(?i)\b(concise|brief|short|detailed|verbose)\s+(?:answers|responses|explanations|replies)\b")
                .unwrap(),
        ),
        (
            "test_framework",
            Regex::new(r"(?i)\b(?:prefer|use|using)\s+(pytest|jest|vitest|junit|proptest|mocha)\b").unwrap(),
        ),
    ]
});

/// Records user preferences stated in the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferenceExtractor;

impl ContextExtractor for PreferenceExtractor {
    fn name(&self) -> &str {
        "preferences"
    }

    fn extract(&self, request: &Request, _response: &Response, data: &mut ContextData) {
        for (key, pattern) in PREFERENCE_PATTERNS.iter() {
            if let Some(value) = pattern.captures(&request.content).and_then(|c| c.get(1)) {
                data.user_preferences
                    .insert((*key).to_string(), Value::String(value.as_str().to_lowercase()));
            }
        }
    }
}

/// Topic keyword tables used for knowledge-base tagging.
const TOPICS: &[(&str, &[&str])] = &[
    ("database", &["sql", "database", "query", "schema", "migration", "index"]),
    ("testing", &["test", "assert", "mock", "fixture", "coverage"]),
    ("performance", &["performance", "latency", "slow", "optimize", "benchmark", "memory usage"]),
    ("security", &["security", "auth", "token", "password", "encrypt", "vulnerab"]),
    ("deployment", &["deploy", "docker", "kubernetes", "ci", "pipeline", "release"]),
    ("api", &["api", "endpoint", "http", "rest", "graphql", "request handler"]),
];

/// Tags topics discussed in an exchange in the knowledge base, with a
/// mention count and the time the topic was last seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeExtractor;

impl KnowledgeExtractor {
    fn mentions(text: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|keyword| {
            text.split(|c: char| !c.is_alphanumeric())
                .any(|word| word.starts_with(keyword))
                || (keyword.contains(' ') && text.contains(keyword))
        })
    }
}

impl ContextExtractor for KnowledgeExtractor {
    fn name(&self) -> &str {
        "knowledge"
    }

    fn extract(&self, request: &Request, response: &Response, data: &mut ContextData) {
        let text = format!("{}\n{}", request.content, response.content).to_lowercase();
        let now = Utc::now().to_rfc3339();

        for (topic, keywords) in TOPICS {
            if !Self::mentions(&text, keywords) {
                continue;
            }
            let previous = data
                .knowledge_base
                .get(*topic)
                .and_then(|v| v.get("mentions"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            data.knowledge_base.insert(
                (*topic).to_string(),
                json!({ "mentions": previous + 1, "lastSeen": now }),
            );
        }
    }
}

static ENTITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // `quoted identifiers`
        Regex::new(r"`([^`\s]{2,60})`").unwrap(),
        // CamelCase type names
        Regex::new(r"\b([A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+)\b").unwrap(),
        // file paths with a known extension
        Regex::new(r"\b([\w\-./]+\.(?:rs|py|ts|tsx|js|go|java|toml|json|yaml|yml|md|sql))\b").unwrap(),
    ]
});

/// Counts code entities (identifiers, type names, file paths) mentioned in
/// the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityExtractor;

impl ContextExtractor for EntityExtractor {
    fn name(&self) -> &str {
        "entities"
    }

    fn extract(&self, request: &Request, _response: &Response, data: &mut ContextData) {
        let mut seen = std::collections::BTreeSet::new();
        for pattern in ENTITY_PATTERNS.iter() {
            for capture in pattern.captures_iter(&request.content) {
                if let Some(entity) = capture.get(1) {
                    seen.insert(entity.as_str().to_string());
                }
            }
        }
        for entity in seen {
            *data.entity_recognition.entry(entity).or_insert(0) += 1;
        }
    }
}
