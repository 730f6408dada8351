// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-table trigger classification.
//!
//! Maps request text to trigger keywords with plain substring and word-prefix
//! matching. No model call, no network.

use std::collections::BTreeSet;

use cortex_core::TriggerClassifier;

/// Default keyword table: trigger followed by the phrases that raise it.
const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    (
        "code_implementation",
        &[
            "implement", "write a function", "write code", "write a program", "create a class",
            "add a feature", "build a", "scaffold",
        ],
    ),
    (
        "code_review",
        &["review", "refactor", "clean up", "code quality", "lint", "readability"],
    ),
    (
        "error_handling",
        &["error", "exception", "panic", "stack trace", "traceback", "unwrap"],
    ),
    (
        "debugging",
        &["debug", "bug", "not working", "broken", "crash", "fails", "failing"],
    ),
    (
        "documentation",
        &["document", "docs", "readme", "docstring", "doc comment", "changelog"],
    ),
    ("testing", &["unit test", "integration test", "test case", "coverage"]),
];

/// Classifies text against a table of trigger keywords.
///
/// Single-word keywords match the start of a word, so `debug` also matches
/// `debugging`; multi-word phrases match as substrings. Matching ignores case.
#[derive(Debug, Clone)]
pub struct KeywordTriggerClassifier {
    table: Vec<(String, Vec<String>)>,
}

impl KeywordTriggerClassifier {
    pub fn new() -> Self {
        Self::with_table(
            DEFAULT_TABLE
                .iter()
                .map(|(trigger, keywords)| (*trigger, keywords.iter().copied())),
        )
    }

    /// Builds a classifier from `(trigger, keywords)` pairs.
    pub fn with_table<I, T, K, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (T, K)>,
        T: Into<String>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            table: table
                .into_iter()
                .map(|(trigger, keywords)| {
                    (
                        trigger.into(),
                        keywords
                            .into_iter()
                            .map(|k| k.as_ref().to_lowercase())
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    /// Triggers this classifier can produce.
    pub fn triggers(&self) -> Vec<&str> {
        self.table.iter().map(|(t, _)| t.as_str()).collect()
    }
}

impl Default for KeywordTriggerClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_keyword(text: &str, words: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        text.contains(keyword)
    } else {
        words.iter().any(|w| w.starts_with(keyword))
    }
}

impl TriggerClassifier for KeywordTriggerClassifier {
    fn classify(&self, text: &str) -> BTreeSet<String> {
        let text = text.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
            .collect();

        self.table
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| matches_keyword(&text, &words, k)))
            .map(|(trigger, _)| trigger.clone())
            .collect()
    }
}
