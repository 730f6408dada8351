// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cortex.toml` > `~/.config/cortex/cortex.toml` > `/etc/cortex/cortex.toml`
//! with environment variable overrides via `CORTEX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CortexConfig;

/// Top-level config sections, used to map `CORTEX_<SECTION>_<KEY>` env vars.
const SECTIONS: &[&str] = &[
    "logging",
    "storage",
    "memory",
    "compression",
    "context",
    "rules",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cortex/cortex.toml` (system-wide)
/// 3. `~/.config/cortex/cortex.toml` (user XDG config)
/// 4. `./cortex.toml` (local directory)
/// 5. `CORTEX_*` environment variables
pub fn load_config() -> Result<CortexConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CortexConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CortexConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::file("/etc/cortex/cortex.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cortex/cortex.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cortex.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CORTEX_RULES_RULE_TIMEOUT_MS` must map to
/// `rules.rule_timeout_ms`, not `rules.rule.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("CORTEX_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
