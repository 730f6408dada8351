// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cortex feedback add` and `cortex feedback list`.

use std::fmt::Write as _;

use cortex_core::CortexError;
use cortex_rules::FeedbackEntry;
use cortex_runtime::Runtime;

use crate::status;

/// Records feedback and reports the resulting effectiveness change, if any.
pub async fn add(
    runtime: &Runtime,
    score: f64,
    rule: Option<String>,
    session: Option<String>,
    comment: Option<String>,
    color: bool,
) -> Result<String, CortexError> {
    if !(0.0..=1.0).contains(&score) {
        return Err(CortexError::Config(format!(
            "feedback score must be between 0 and 1, got {score}"
        )));
    }

    let mut entry = FeedbackEntry::new(score);
    if let Some(rule) = rule {
        entry = entry.for_rule(rule);
    }
    if let Some(session) = session {
        entry = entry.for_session(session);
    }
    if let Some(comment) = comment {
        entry = entry.with_comment(comment);
    }

    let update = runtime.engine().record_feedback(&entry).await?;
    let mut out = status("recorded", true, color);
    if let Some(update) = update {
        let _ = write!(
            out,
            " {}: score {:.3} -> {:.3}",
            update.rule_id, update.old_score, update.new_score
        );
        if update.priority_delta != 0 {
            let _ = write!(out, ", priority {:+}", update.priority_delta);
        }
    }
    Ok(out)
}

/// Recorded feedback, oldest first.
pub async fn list(runtime: &Runtime, json: bool) -> Result<String, CortexError> {
    let entries = runtime.engine().feedback_entries().await?;
    if json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }
    if entries.is_empty() {
        return Ok("no feedback recorded".to_string());
    }

    let mut out = String::new();
    for entry in &entries {
        let _ = write!(
            out,
            "{}  {:.2}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.score,
            entry.rule_id.as_deref().unwrap_or("-"),
        );
        if let Some(comment) = &entry.comment {
            let _ = write!(out, "  {comment}");
        }
        out.push('\n');
    }
    Ok(out.trim_end().to_string())
}
