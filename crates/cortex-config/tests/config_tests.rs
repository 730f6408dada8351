// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Cortex configuration system.

use cortex_config::diagnostic::ConfigError;
use cortex_config::model::CortexConfig;
use cortex_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_cortex_config() {
    let toml = r#"
[logging]
log_level = "debug"

[storage]
backend = "memory"
database_path = "/tmp/cortex-test.db"
wal_mode = false
feedback_cap = 50

[memory]
short_term_capacity = 4
working_capacity = 8
long_term_capacity = 16

[compression]
min_size = 500
level2_size = 5000
level3_size = 25000

[context]
max_interactions = 10
retained_head = 2
urgency_markers = ["panic"]

[rules]
ema_alpha = 0.25
rule_timeout_ms = 250
always_active = ["core"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.logging.log_level, "debug");
    assert_eq!(config.storage.backend, "memory");
    assert_eq!(config.storage.database_path, "/tmp/cortex-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.feedback_cap, 50);
    assert_eq!(config.storage.metrics_cap, 100);
    assert_eq!(config.memory.short_term_capacity, 4);
    assert_eq!(config.memory.working_promotion_threshold, 5);
    assert_eq!(config.compression.level3_size, 25_000);
    assert_eq!(config.context.max_interactions, 10);
    assert_eq!(config.context.retained_head, 2);
    assert_eq!(config.context.urgency_markers, vec!["panic"]);
    assert_eq!(config.rules.ema_alpha, 0.25);
    assert_eq!(config.rules.rule_timeout_ms, 250);
    assert_eq!(config.rules.always_active, vec!["core"]);
}

/// Empty TOML yields the tuned defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.logging.log_level, "info");
    assert_eq!(config.storage.backend, "sqlite");
    assert!(config.storage.database_path.ends_with("cortex.db"));
    assert!(config.storage.wal_mode);
    assert_eq!(config.memory.short_term_capacity, 20);
    assert_eq!(config.memory.working_capacity, 50);
    assert_eq!(config.memory.long_term_capacity, 100);
    assert_eq!(config.memory.long_term_promotion_threshold, 3);
    assert_eq!(config.compression.min_size, 1_000);
    assert_eq!(config.compression.level2_size, 10_000);
    assert_eq!(config.compression.level3_size, 50_000);
    assert_eq!(config.context.max_interactions, 20);
    assert_eq!(config.context.retained_head, 5);
    assert_eq!(config.context.recent_window_secs, 3600);
    assert_eq!(config.context.important_request_chars, 200);
    assert_eq!(config.context.important_response_chars, 500);
    assert!(!config.context.require_durable_create);
    assert_eq!(config.rules.ema_alpha, 0.1);
    assert_eq!(config.rules.default_score, 1.0);
    assert_eq!(config.rules.max_adjustment, 2);
    assert_eq!(config.rules.always_active, vec!["core", "enhancement"]);
}

/// Unknown field in [memory] is rejected.
#[test]
fn unknown_field_in_memory_produces_error() {
    let toml = r#"
[memory]
working_capacty = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("working_capacty"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// Unknown keys become diagnostics carrying a suggestion.
#[test]
fn unknown_key_diagnostic_suggests_correction() {
    let toml = r#"
[rules]
ema_alpah = 0.2
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "ema_alpah");
            assert_eq!(suggestion.as_deref(), Some("ema_alpha"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// A value of the wrong type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[memory]
short_term_capacity = "twenty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected an InvalidType error, got {errors:?}"
    );
}

/// Semantic validation runs after successful deserialization.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[compression]
min_size = 20000
"#;

    let errors = load_and_validate_str(toml).expect_err("thresholds out of order");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

/// Dotted overrides (what `CORTEX_*` env vars map to) beat TOML values.
#[test]
fn dotted_override_beats_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: CortexConfig = Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::string("[rules]\nrule_timeout_ms = 100\n"))
        .merge(("rules.rule_timeout_ms", 900))
        .extract()
        .expect("should merge override");

    assert_eq!(config.rules.rule_timeout_ms, 900);
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: CortexConfig = Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::file("/nonexistent/path/cortex.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.memory.short_term_capacity, 20);
}

/// The default config round-trips through TOML serialization.
#[test]
fn default_config_serializes_to_toml() {
    let rendered = toml::to_string(&CortexConfig::default()).expect("serialize");
    let parsed = load_config_from_str(&rendered).expect("reparse");
    assert_eq!(parsed.rules.always_active, vec!["core", "enhancement"]);
    assert_eq!(parsed.context.urgency_markers.len(), 7);
}

/// `CORTEX_*` variables override values from the config file.
#[test]
#[serial]
fn env_var_overrides_config_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("cortex.toml", "[rules]\nrule_timeout_ms = 1000\n")?;
        jail.set_env("CORTEX_RULES_RULE_TIMEOUT_MS", "250");
        jail.set_env("CORTEX_STORAGE_BACKEND", "memory");

        let config = load_and_validate_path(std::path::Path::new("cortex.toml"))
            .map_err(|errors| format!("{} config errors", errors.len()))?;
        assert_eq!(config.rules.rule_timeout_ms, 250);
        assert_eq!(config.storage.backend, "memory");
        Ok(())
    });
}

/// An env override is validated like any other value.
#[test]
#[serial]
fn invalid_env_override_is_rejected() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("cortex.toml", "")?;
        jail.set_env("CORTEX_STORAGE_BACKEND", "redis");

        let errors = load_and_validate_path(std::path::Path::new("cortex.toml"))
            .expect_err("unknown backend");
        assert!(matches!(errors[0], ConfigError::Validation { .. }));
        Ok(())
    });
}
