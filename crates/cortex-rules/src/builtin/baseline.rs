// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Always-active rules.

use async_trait::async_trait;
use cortex_core::CortexError;
use serde_json::Value;

use crate::rule::{Rule, RuleResult, RuleTarget};

/// Copies the session's known user preferences into the request's
/// `preferences` attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferenceInjection;

#[async_trait]
impl Rule for PreferenceInjection {
    fn name(&self) -> &str {
        "preference_injection"
    }

    fn description(&self) -> &str {
        "Attach stored user preferences to the request"
    }

    fn priority(&self) -> i32 {
        100
    }

    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError> {
        let preferences = &target.context.data.user_preferences;
        if preferences.is_empty() {
            return Ok(RuleResult::unchanged());
        }
        let value = Value::Object(
            preferences
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        if target.request.attributes.get("preferences") == Some(&value) {
            return Ok(RuleResult::unchanged());
        }
        let count = preferences.len();
        target
            .request
            .attributes
            .insert("preferences".to_string(), value);
        Ok(RuleResult::modified(format!("attached {count} preferences")))
    }
}

/// Attaches the context summary once the session has history.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSummary;

#[async_trait]
impl Rule for SessionSummary {
    fn name(&self) -> &str {
        "session_summary"
    }

    fn priority(&self) -> i32 {
        90
    }

    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError> {
        if target.context.data.interactions.is_empty() {
            return Ok(RuleResult::unchanged());
        }
        let summary = Value::String(target.context.metadata.summary.clone());
        if target.request.attributes.get("context_summary") == Some(&summary) {
            return Ok(RuleResult::unchanged());
        }
        target
            .request
            .attributes
            .insert("context_summary".to_string(), summary);
        Ok(RuleResult::modified("attached context summary"))
    }
}

/// Trims trailing whitespace and collapses runs of blank lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNormalization;

impl WhitespaceNormalization {
    pub fn normalize(text: &str) -> String {
        let mut out: Vec<&str> = Vec::new();
        let mut blank_run = 0;
        for line in text.trim().lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push(line);
        }
        out.join("\n")
    }
}

#[async_trait]
impl Rule for WhitespaceNormalization {
    fn name(&self) -> &str {
        "whitespace_normalization"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError> {
        let normalized = Self::normalize(&target.request.content);
        if normalized == target.request.content {
            return Ok(RuleResult::unchanged());
        }
        target.request.content = normalized;
        Ok(RuleResult::modified("normalized whitespace"))
    }
}

#[cfg(test)]
mod tests {
    use cortex_core::{Context, Interaction, Request, Response};
    use serde_json::json;

    use super::*;

    fn target(content: &str) -> RuleTarget {
        RuleTarget::new(Request::new(content), Context::fresh("s"))
    }

    #[tokio::test]
    async fn preferences_injected_once() {
        let mut t = target("hi");
        t.context
            .data
            .user_preferences
            .insert("language".into(), json!("rust"));

        let first = PreferenceInjection.execute(&mut t).await.unwrap();
        assert!(first.modified);
        assert_eq!(t.request.attributes["preferences"], json!({"language": "rust"}));

        let second = PreferenceInjection.execute(&mut t).await.unwrap();
        assert!(!second.modified);
    }

    #[tokio::test]
    async fn no_preferences_no_change() {
        let mut t = target("hi");
        assert_eq!(PreferenceInjection.execute(&mut t).await.unwrap(), RuleResult::unchanged());
        assert!(t.request.attributes.is_empty());
    }

    #[tokio::test]
    async fn summary_needs_history() {
        let mut t = target("hi");
        assert!(!SessionSummary.execute(&mut t).await.unwrap().modified);

        t.context.data.interactions.push(Interaction {
            timestamp: chrono::Utc::now(),
            request: Request::new("q"),
            response: Response::new("a"),
            summary: "Q: q | A: a".into(),
        });
        t.context.metadata.summary = "1 interactions".into();
        assert!(SessionSummary.execute(&mut t).await.unwrap().modified);
        assert_eq!(t.request.attributes["context_summary"], json!("1 interactions"));
    }

    #[test]
    fn normalize_collapses_blank_runs() {
        assert_eq!(
            WhitespaceNormalization::normalize("  first  \n\n\n\nsecond\t\n\nthird  "),
            "first\n\nsecond\n\nthird"
        );
    }

    #[tokio::test]
    async fn clean_text_is_unchanged() {
        let mut t = target("already clean");
        let result = WhitespaceNormalization.execute(&mut t).await.unwrap();
        assert!(result.success && !result.modified);
    }
}
