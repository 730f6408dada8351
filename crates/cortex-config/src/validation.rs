// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as ordered thresholds and non-zero capacities.

use crate::diagnostic::ConfigError;
use crate::model::{CortexConfig, STORAGE_BACKENDS};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CortexConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    // Storage
    if !STORAGE_BACKENDS.contains(&config.storage.backend.as_str()) {
        fail(format!(
            "storage.backend `{}` is not one of: {}",
            config.storage.backend,
            STORAGE_BACKENDS.join(", ")
        ));
    }
    if config.storage.backend == "sqlite" && config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }
    if config.storage.feedback_cap == 0 {
        fail("storage.feedback_cap must be at least 1".to_string());
    }
    if config.storage.metrics_cap == 0 {
        fail("storage.metrics_cap must be at least 1".to_string());
    }

    // Memory tiers
    for (name, capacity) in [
        ("short_term_capacity", config.memory.short_term_capacity),
        ("working_capacity", config.memory.working_capacity),
        ("long_term_capacity", config.memory.long_term_capacity),
    ] {
        if capacity == 0 {
            fail(format!("memory.{name} must be at least 1"));
        }
    }

    // Compression thresholds must be strictly increasing.
    let c = &config.compression;
    if !(c.min_size < c.level2_size && c.level2_size < c.level3_size) {
        fail(format!(
            "compression thresholds must satisfy min_size < level2_size < level3_size, got {} / {} / {}",
            c.min_size, c.level2_size, c.level3_size
        ));
    }

    // Context
    let ctx = &config.context;
    if ctx.max_interactions == 0 {
        fail("context.max_interactions must be at least 1".to_string());
    }
    if ctx.retained_head >= ctx.max_interactions {
        fail(format!(
            "context.retained_head ({}) must be smaller than context.max_interactions ({})",
            ctx.retained_head, ctx.max_interactions
        ));
    }
    if ctx.summary_chars == 0 {
        fail("context.summary_chars must be at least 1".to_string());
    }

    // Rules
    let rules = &config.rules;
    if !(rules.ema_alpha > 0.0 && rules.ema_alpha <= 1.0) {
        fail(format!(
            "rules.ema_alpha must be in (0, 1], got {}",
            rules.ema_alpha
        ));
    }
    if rules.demote_score >= rules.promote_score {
        fail(format!(
            "rules.demote_score ({}) must be below rules.promote_score ({})",
            rules.demote_score, rules.promote_score
        ));
    }
    if rules.adjustment_threshold < 0.0 {
        fail(format!(
            "rules.adjustment_threshold must be non-negative, got {}",
            rules.adjustment_threshold
        ));
    }
    if rules.max_adjustment < 0 {
        fail(format!(
            "rules.max_adjustment must be non-negative, got {}",
            rules.max_adjustment
        ));
    }
    if rules.rule_timeout_ms == 0 {
        fail("rules.rule_timeout_ms must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
