// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default summarizer and importance predicate, plus tier placement.

use cortex_config::model::ContextConfig;
use cortex_core::{ContextData, ImportancePredicate, Request, Response, Summarizer};
use cortex_memory::MemoryTier;

/// Truncates `text` to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// Summarizes an exchange as the leading text of its request and response.
#[derive(Debug, Clone)]
pub struct TruncatingSummarizer {
    max_chars: usize,
}

impl TruncatingSummarizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Summarizer for TruncatingSummarizer {
    fn summarize(&self, request: &Request, response: &Response) -> String {
        let half = (self.max_chars / 2).max(4);
        let first_line = |s: &str| s.lines().next().unwrap_or_default().to_string();
        format!(
            "Q: {} | A: {}",
            truncate_chars(&first_line(&request.content), half),
            truncate_chars(&first_line(&response.content), half)
        )
    }
}

/// Flags exchanges whose text contains any of a list of markers,
/// compared case-insensitively.
#[derive(Debug, Clone)]
pub struct MarkerImportance {
    markers: Vec<String>,
}

impl MarkerImportance {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }
}

impl ImportancePredicate for MarkerImportance {
    fn has_markers(&self, request: &Request, response: &Response) -> bool {
        let request = request.content.to_lowercase();
        let response = response.content.to_lowercase();
        self.markers
            .iter()
            .any(|m| request.contains(m.as_str()) || response.contains(m.as_str()))
    }
}

/// Tier for a context: both recent and important goes to short-term,
/// exactly one goes to working, neither goes to long-term.
pub fn placement(recent: bool, important: bool) -> MemoryTier {
    match (recent, important) {
        (true, true) => MemoryTier::ShortTerm,
        (true, false) | (false, true) => MemoryTier::Working,
        (false, false) => MemoryTier::LongTerm,
    }
}

/// Importance of an exchange: markers, or a long request or response.
pub(crate) fn is_important(
    config: &ContextConfig,
    predicate: &dyn ImportancePredicate,
    request: &Request,
    response: &Response,
) -> bool {
    predicate.has_markers(request, response)
        || request.content.chars().count() > config.important_request_chars
        || response.content.chars().count() > config.important_response_chars
}

/// Derived one-line description of a context, stored as `metadata.summary`.
pub fn describe(data: &ContextData) -> String {
    let mut parts = vec![format!("{} interactions", data.interactions.len())];

    if let Some(last) = data.interactions.last() {
        parts.push(format!("last: {}", last.summary));
    }
    if !data.user_preferences.is_empty() {
        let keys: Vec<&str> = data.user_preferences.keys().map(String::as_str).collect();
        parts.push(format!("preferences: {}", keys.join(", ")));
    }
    if !data.knowledge_base.is_empty() {
        let topics: Vec<&str> = data.knowledge_base.keys().map(String::as_str).collect();
        parts.push(format!("topics: {}", topics.join(", ")));
    }

    let mut entities: Vec<(&String, &u64)> = data.entity_recognition.iter().collect();
    entities.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    if !entities.is_empty() {
        let top: Vec<&str> = entities.iter().take(3).map(|(name, _)| name.as_str()).collect();
        parts.push(format!("entities: {}", top.join(", ")));
    }

    parts.join("; ")
}
