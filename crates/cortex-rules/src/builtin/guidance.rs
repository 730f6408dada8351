// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-demand rules that attach topic guidance to a request.

use async_trait::async_trait;
use cortex_core::{CortexError, Interaction};
use serde_json::Value;

use super::{GUIDELINES_ATTRIBUTE, append_to_list};
use crate::rule::{Rule, RuleResult, RuleTarget};

const CODING: &[&str] = &[
    "Prefer small functions with a single responsibility",
    "Handle errors explicitly instead of ignoring them",
    "Name things after what they do",
    "Cover new behavior with tests",
];

const TROUBLESHOOTING: &[&str] = &[
    "Reproduce the failure with the smallest possible input",
    "Read the full error message and stack trace",
    "Check what changed since it last worked",
    "Verify assumptions with logging or a debugger before fixing",
];

const DOCUMENTATION: &[&str] = &[
    "Start with what the thing does, then how to use it",
    "Include a minimal working example",
    "Document errors and edge cases",
];

/// Attaches a fixed list of guidelines, tagged with the session's preferred
/// language when one is known.
#[derive(Debug, Clone)]
pub struct Guidelines {
    name: &'static str,
    priority: i32,
    items: &'static [&'static str],
}

impl Guidelines {
    pub fn coding() -> Self {
        Self {
            name: "coding_guidelines",
            priority: 40,
            items: CODING,
        }
    }

    pub fn troubleshooting() -> Self {
        Self {
            name: "troubleshooting_checklist",
            priority: 45,
            items: TROUBLESHOOTING,
        }
    }

    pub fn documentation() -> Self {
        Self {
            name: "doc_guidelines",
            priority: 30,
            items: DOCUMENTATION,
        }
    }
}

#[async_trait]
impl Rule for Guidelines {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError> {
        let language = target
            .context
            .data
            .user_preferences
            .get("language")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut items: Vec<String> = self.items.iter().map(|s| s.to_string()).collect();
        if let Some(language) = language {
            items.push(format!("Follow idiomatic {language} conventions"));
        }

        if append_to_list(&mut target.request.attributes, GUIDELINES_ATTRIBUTE, items) {
            Ok(RuleResult::modified(format!("attached {}", self.name)))
        } else {
            Ok(RuleResult::unchanged())
        }
    }
}

/// Attaches summaries of the session's most recent failing exchanges.
#[derive(Debug, Clone)]
pub struct RecentFailures {
    markers: Vec<String>,
    limit: usize,
}

impl Default for RecentFailures {
    fn default() -> Self {
        Self {
            markers: ["error", "fail", "exception", "panic", "crash"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            limit: 3,
        }
    }
}

impl RecentFailures {
    fn is_failure(&self, interaction: &Interaction) -> bool {
        let request = interaction.request.content.to_lowercase();
        let response = interaction.response.content.to_lowercase();
        self.markers
            .iter()
            .any(|m| request.contains(m.as_str()) || response.contains(m.as_str()))
    }
}

#[async_trait]
impl Rule for RecentFailures {
    fn name(&self) -> &str {
        "recent_failures"
    }

    fn priority(&self) -> i32 {
        44
    }

    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError> {
        let mut failures: Vec<String> = target
            .context
            .data
            .interactions
            .iter()
            .rev()
            .filter(|i| self.is_failure(i))
            .take(self.limit)
            .map(|i| i.summary.clone())
            .collect();
        if failures.is_empty() {
            return Ok(RuleResult::unchanged());
        }
        failures.reverse();

        let count = failures.len();
        if append_to_list(&mut target.request.attributes, "recent_failures", failures) {
            Ok(RuleResult::modified(format!("attached {count} recent failures")))
        } else {
            Ok(RuleResult::unchanged())
        }
    }
}
