// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only views: `cortex context`, `cortex rules` and `cortex config`.

use std::fmt::Write as _;

use cortex_config::model::CortexConfig;
use cortex_core::CortexError;
use cortex_rules::RuleSetState;
use cortex_runtime::Runtime;
use serde_json::json;

use crate::{heading, status};

/// Serializes the effective configuration back to TOML.
pub fn render_config(config: &CortexConfig) -> Result<String, CortexError> {
    toml::to_string_pretty(config).map_err(|e| CortexError::Config(e.to_string()))
}

/// Shows a session's decoded context and its cache placement.
pub async fn context(
    runtime: &Runtime,
    session: &str,
    json: bool,
    color: bool,
) -> Result<String, CortexError> {
    let context = runtime.contexts().get_context(session).await?;
    let placement = runtime.contexts().placement(session);

    if json {
        let value = json!({
            "context": context,
            "tier": placement,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} {}", heading("Session", color), context.session_id);
    let _ = writeln!(out, "  id:           {}", context.id);
    let _ = writeln!(out, "  updated:      {}", context.last_updated.to_rfc3339());
    let _ = writeln!(out, "  interactions: {}", context.data.interactions.len());
    let _ = writeln!(
        out,
        "  compression:  {} ({} -> {} bytes)",
        context.metadata.compression_level,
        context.metadata.original_size,
        context.metadata.compressed_size,
    );
    let tier = placement.map_or_else(|| "uncached".to_string(), |t| t.to_string());
    let _ = writeln!(out, "  tier:         {tier}");
    let _ = writeln!(out, "  summary:      {}", context.metadata.summary);

    if !context.data.user_preferences.is_empty() {
        let _ = writeln!(out, "{}", heading("Preferences", color));
        for (key, value) in &context.data.user_preferences {
            let _ = writeln!(out, "  {key}: {value}");
        }
    }
    if !context.data.knowledge_base.is_empty() {
        let topics: Vec<&str> = context.data.knowledge_base.keys().map(String::as_str).collect();
        let _ = writeln!(out, "{} {}", heading("Topics:", color), topics.join(", "));
    }
    Ok(out.trim_end().to_string())
}

/// Lists rule sets and the active rules in execution order, after loading
/// any sets named in `load`.
pub async fn rules(
    runtime: &Runtime,
    load: &[String],
    json: bool,
    color: bool,
) -> Result<String, CortexError> {
    let engine = runtime.engine();
    for name in load {
        engine.load_rule_set(name).await?;
    }

    let sets = engine.rule_sets().await;
    let active = engine.get_active_rules().await;
    let history = engine.effectiveness();
    let score = |id: &str| history.scores.get(id).copied();

    if json {
        let rules: Vec<_> = active
            .iter()
            .map(|rule| {
                json!({
                    "id": rule.id,
                    "ruleSet": rule.rule_set,
                    "priority": rule.priority,
                    "score": score(&rule.id),
                })
            })
            .collect();
        let value = json!({ "ruleSets": sets, "activeRules": rules });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", heading("Rule sets", color));
    for set in &sets {
        let active = set.state == RuleSetState::Active;
        let mut line = format!(
            "  {:<10} {:<16} {}",
            status(&set.state.to_string(), active, color),
            set.name,
            set.kind
        );
        if !set.triggers.is_empty() {
            let _ = write!(line, " [{}]", set.triggers.join(", "));
        }
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out, "{}", heading("Active rules", color));
    for rule in &active {
        let score = score(&rule.id).map_or_else(|| "-".to_string(), |s| format!("{s:.2}"));
        let _ = writeln!(out, "  {:>4}  {:<5} {}", rule.priority, score, rule.id);
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn runtime() -> Runtime {
        let mut config = CortexConfig::default();
        config.storage.backend = "memory".to_string();
        Runtime::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn rules_lists_always_active_sets() {
        let runtime = runtime().await;
        let output = rules(&runtime, &[], false, false).await.unwrap();
        assert!(output.contains("active     core"));
        assert!(output.contains("unloaded   documentation"));
        assert!(output.contains("core:session_summary"));
    }

    #[tokio::test]
    async fn rules_loads_requested_sets() {
        let runtime = runtime().await;
        let output = rules(&runtime, &["documentation".to_string()], true, false)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let ids: Vec<&str> = value["activeRules"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert!(ids.contains(&"documentation:doc_guidelines"));
    }

    #[tokio::test]
    async fn loading_an_unknown_set_fails() {
        let runtime = runtime().await;
        let err = rules(&runtime, &["nope".to_string()], false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CortexError::RuleSetNotFound { .. }));
    }

    #[tokio::test]
    async fn context_shows_preferences_and_tier() {
        let runtime = runtime().await;
        runtime
            .complete(
                "s",
                &cortex_core::Request::new("I prefer Go"),
                &cortex_core::Response::new("ok"),
            )
            .await
            .unwrap();

        let output = context(&runtime, "s", false, false).await.unwrap();
        assert!(output.contains("interactions: 1"));
        assert!(output.contains("tier:         working"));
        assert!(output.contains("language: \"go\""));

        let value: serde_json::Value =
            serde_json::from_str(&context(&runtime, "s", true, false).await.unwrap()).unwrap();
        assert_eq!(value["tier"], json!("working"));
        assert_eq!(value["context"]["sessionId"], json!("s"));
    }
}
