// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cortex engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Cortex configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to the values the engine was tuned with.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CortexConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tiered memory capacities and promotion thresholds.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Payload size thresholds for compression levels.
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Context store behavior.
    #[serde(default)]
    pub context: ContextConfig,

    /// Rule prioritization and execution settings.
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Store backend: `sqlite` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Maximum number of entries kept under the `feedback` key.
    #[serde(default = "default_log_cap")]
    pub feedback_cap: usize,

    /// Maximum number of entries kept under each `metrics:<category>` key.
    #[serde(default = "default_log_cap")]
    pub metrics_cap: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            feedback_cap: default_log_cap(),
            metrics_cap: default_log_cap(),
        }
    }
}

/// Backends accepted by `storage.backend`.
pub const STORAGE_BACKENDS: &[&str] = &["sqlite", "memory"];

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cortex").join("cortex.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cortex.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_log_cap() -> usize {
    100
}

/// Tiered memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    #[serde(default = "default_short_term_capacity")]
    pub short_term_capacity: usize,

    #[serde(default = "default_working_capacity")]
    pub working_capacity: usize,

    #[serde(default = "default_long_term_capacity")]
    pub long_term_capacity: usize,

    /// A working-memory hit whose access count exceeds this is copied to short-term.
    #[serde(default = "default_working_promotion_threshold")]
    pub working_promotion_threshold: u64,

    /// A long-term hit whose access count exceeds this is copied to working memory.
    #[serde(default = "default_long_term_promotion_threshold")]
    pub long_term_promotion_threshold: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: default_short_term_capacity(),
            working_capacity: default_working_capacity(),
            long_term_capacity: default_long_term_capacity(),
            working_promotion_threshold: default_working_promotion_threshold(),
            long_term_promotion_threshold: default_long_term_promotion_threshold(),
        }
    }
}

fn default_short_term_capacity() -> usize {
    20
}

fn default_working_capacity() -> usize {
    50
}

fn default_long_term_capacity() -> usize {
    100
}

fn default_working_promotion_threshold() -> u64 {
    5
}

fn default_long_term_promotion_threshold() -> u64 {
    3
}

/// Compression level thresholds, in bytes of serialized context data.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompressionConfig {
    /// Payloads smaller than this are never compressed.
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    /// Payloads at least this large use level 2.
    #[serde(default = "default_level2_size")]
    pub level2_size: usize,

    /// Payloads at least this large use level 3.
    #[serde(default = "default_level3_size")]
    pub level3_size: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            level2_size: default_level2_size(),
            level3_size: default_level3_size(),
        }
    }
}

fn default_min_size() -> usize {
    1_000
}

fn default_level2_size() -> usize {
    10_000
}

fn default_level3_size() -> usize {
    50_000
}

/// Context store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Maximum number of interactions kept per context.
    #[serde(default = "default_max_interactions")]
    pub max_interactions: usize,

    /// Number of earliest interactions always kept when trimming.
    #[serde(default = "default_retained_head")]
    pub retained_head: usize,

    /// Contexts updated within this window count as recent.
    #[serde(default = "default_recent_window_secs")]
    pub recent_window_secs: u64,

    /// Requests longer than this (in characters) count as important.
    #[serde(default = "default_important_request_chars")]
    pub important_request_chars: usize,

    /// Responses longer than this (in characters) count as important.
    #[serde(default = "default_important_response_chars")]
    pub important_response_chars: usize,

    /// Maximum length of an interaction summary.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,

    /// Fail `get_context` when a fresh context cannot be persisted.
    #[serde(default)]
    pub require_durable_create: bool,

    /// Case-insensitive substrings marking a failure or urgent exchange.
    #[serde(default = "default_urgency_markers")]
    pub urgency_markers: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_interactions: default_max_interactions(),
            retained_head: default_retained_head(),
            recent_window_secs: default_recent_window_secs(),
            important_request_chars: default_important_request_chars(),
            important_response_chars: default_important_response_chars(),
            summary_chars: default_summary_chars(),
            require_durable_create: false,
            urgency_markers: default_urgency_markers(),
        }
    }
}

fn default_max_interactions() -> usize {
    20
}

fn default_retained_head() -> usize {
    5
}

fn default_recent_window_secs() -> u64 {
    3600 // 1 hour
}

fn default_important_request_chars() -> usize {
    200
}

fn default_important_response_chars() -> usize {
    500
}

fn default_summary_chars() -> usize {
    120
}

fn default_urgency_markers() -> Vec<String> {
    ["error", "fail", "exception", "urgent", "critical", "crash", "broken"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Rule prioritization and execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Weight of a new observation in the effectiveness moving average.
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,

    /// Effectiveness score assumed for rules with no history.
    #[serde(default = "default_score")]
    pub default_score: f64,

    /// Minimum score movement that triggers a priority adjustment.
    #[serde(default = "default_adjustment_threshold")]
    pub adjustment_threshold: f64,

    /// Scores above this propose a priority increase.
    #[serde(default = "default_promote_score")]
    pub promote_score: f64,

    /// Scores below this propose a priority decrease.
    #[serde(default = "default_demote_score")]
    pub demote_score: f64,

    /// Bound on the cumulative priority adjustment, in either direction.
    #[serde(default = "default_max_adjustment")]
    pub max_adjustment: i32,

    /// Per-rule execution timeout in milliseconds.
    #[serde(default = "default_rule_timeout_ms")]
    pub rule_timeout_ms: u64,

    /// Rule sets loaded at startup and never unloaded.
    #[serde(default = "default_always_active")]
    pub always_active: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            ema_alpha: default_ema_alpha(),
            default_score: default_score(),
            adjustment_threshold: default_adjustment_threshold(),
            promote_score: default_promote_score(),
            demote_score: default_demote_score(),
            max_adjustment: default_max_adjustment(),
            rule_timeout_ms: default_rule_timeout_ms(),
            always_active: default_always_active(),
        }
    }
}

fn default_ema_alpha() -> f64 {
    0.1
}

fn default_score() -> f64 {
    1.0
}

fn default_adjustment_threshold() -> f64 {
    0.2
}

fn default_promote_score() -> f64 {
    0.8
}

fn default_demote_score() -> f64 {
    0.3
}

fn default_max_adjustment() -> i32 {
    2
}

fn default_rule_timeout_ms() -> u64 {
    5_000
}

fn default_always_active() -> Vec<String> {
    vec!["core".to_string(), "enhancement".to_string()]
}
