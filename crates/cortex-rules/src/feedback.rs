// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capped feedback and metrics logs kept in the durable store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cortex_core::{CortexError, DurableStore};
use cortex_storage::CappedLog;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Durable key of the feedback log.
pub const FEEDBACK_KEY: &str = "feedback";

/// Prefix of every metrics log key; the category follows it.
pub const METRICS_KEY_PREFIX: &str = "metrics:";

/// A user or caller judgement of how useful a result was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// Rule the feedback is about; also feeds its effectiveness score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn new(score: f64) -> Self {
        Self {
            rule_id: None,
            session_id: None,
            score,
            comment: None,
            timestamp: Utc::now(),
        }
    }

    pub fn for_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Appends feedback entries under [`FEEDBACK_KEY`], oldest dropped first.
pub struct FeedbackLog {
    log: CappedLog,
}

impl FeedbackLog {
    pub fn new(store: Arc<dyn DurableStore>, cap: usize) -> Self {
        Self {
            log: CappedLog::new(store, FEEDBACK_KEY, cap),
        }
    }

    /// Appends `entry`; returns the log length afterwards.
    pub async fn record(&self, entry: &FeedbackEntry) -> Result<usize, CortexError> {
        self.log.append(serde_json::to_value(entry)?).await
    }

    /// Entries oldest first. Entries that no longer parse are skipped.
    pub async fn entries(&self) -> Result<Vec<FeedbackEntry>, CortexError> {
        let raw = self.log.entries().await?;
        let entries = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable feedback entry");
                    None
                }
            })
            .collect();
        Ok(entries)
    }
}

/// One timestamped sample in a metrics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub value: Value,
}

/// Per-category capped sample logs under `metrics:<category>`.
pub struct MetricsLog {
    store: Arc<dyn DurableStore>,
    cap: usize,
    logs: DashMap<String, Arc<CappedLog>>,
}

impl MetricsLog {
    pub fn new(store: Arc<dyn DurableStore>, cap: usize) -> Self {
        Self {
            store,
            cap,
            logs: DashMap::new(),
        }
    }

    fn log(&self, category: &str) -> Arc<CappedLog> {
        self.logs
            .entry(category.to_string())
            .or_insert_with(|| {
                Arc::new(CappedLog::new(
                    self.store.clone(),
                    format!("{METRICS_KEY_PREFIX}{category}"),
                    self.cap,
                ))
            })
            .clone()
    }

    /// Appends a sample to the category's log.
    pub async fn record(&self, category: &str, value: Value) -> Result<usize, CortexError> {
        let sample = MetricSample {
            timestamp: Utc::now(),
            value,
        };
        self.log(category)
            .append(serde_json::to_value(sample)?)
            .await
    }

    pub async fn samples(&self, category: &str) -> Result<Vec<MetricSample>, CortexError> {
        let raw = self.log(category).entries().await?;
        let samples = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        Ok(samples)
    }
}
