// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cortex apply` and `cortex record`.

use std::fmt::Write as _;

use cortex_core::{CortexError, Request, Response};
use cortex_rules::RuleOutcome;
use cortex_rules::engine::TRIGGERS_ATTRIBUTE;
use cortex_runtime::Runtime;
use serde_json::json;

use crate::{heading, status};

/// Runs the rule pipeline over `text` for `session`.
pub async fn apply(
    runtime: &Runtime,
    session: &str,
    text: &str,
    triggers: &[String],
    json: bool,
    color: bool,
) -> Result<String, CortexError> {
    let mut request = Request::new(text);
    if !triggers.is_empty() {
        request = request.with_attribute(TRIGGERS_ATTRIBUTE, json!(triggers));
    }
    let outcome = runtime.process(session, &request).await?;

    if json {
        let value = json!({
            "request": outcome.request,
            "modified": outcome.modified,
            "applied": outcome.applied,
            "failed": outcome.failed,
            "triggers": outcome.triggers,
            "loaded": outcome.loaded,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }
    Ok(render_outcome(&outcome, color))
}

fn render_outcome(outcome: &RuleOutcome, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", heading("Request", color));
    let _ = writeln!(out, "  {}", outcome.request.content);
    for (key, value) in &outcome.request.attributes {
        let _ = writeln!(out, "  {key}: {value}");
    }

    if !outcome.triggers.is_empty() {
        let triggers: Vec<&str> = outcome.triggers.iter().map(String::as_str).collect();
        let _ = writeln!(out, "{} {}", heading("Triggers:", color), triggers.join(", "));
    }
    if !outcome.loaded.is_empty() {
        let _ = writeln!(out, "{} {}", heading("Loaded:", color), outcome.loaded.join(", "));
    }

    let _ = writeln!(out, "{}", heading("Rules", color));
    for id in &outcome.applied {
        let _ = writeln!(out, "  {} {id}", status("ok", true, color));
    }
    for id in &outcome.failed {
        let _ = writeln!(out, "  {} {id}", status("failed", false, color));
    }
    out.trim_end().to_string()
}

/// Records a finished exchange in the session's context.
pub async fn record(
    runtime: &Runtime,
    session: &str,
    request: &str,
    response: &str,
    color: bool,
) -> Result<String, CortexError> {
    let context = runtime
        .complete(session, &Request::new(request), &Response::new(response))
        .await?;
    Ok(format!(
        "{} {} ({} interactions, {})",
        status("recorded", true, color),
        context.session_id,
        context.data.interactions.len(),
        context.metadata.compression_level,
    ))
}
