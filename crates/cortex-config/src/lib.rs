// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Cortex engine.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use cortex_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("short-term capacity: {}", config.memory.short_term_capacity);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CortexConfig;

use std::path::{Path, PathBuf};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `CortexConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<CortexConfig, Vec<ConfigError>> {
    validated(loader::load_config(), || {
        search_paths()
            .into_iter()
            .filter_map(|path| read_source(&path))
            .collect()
    })
}

/// Load configuration from a specific file and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<CortexConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load configuration from a TOML string and validate it. Environment
/// variables are not consulted.
pub fn load_and_validate_str(toml_content: &str) -> Result<CortexConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Runs semantic validation on a loaded config, or turns a load failure
/// into diagnostics with spans resolved against `sources`.
fn validated(
    loaded: Result<CortexConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<CortexConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Config files in lookup order: local, user, system.
fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        std::env::current_dir()
            .map(|d| d.join("cortex.toml"))
            .unwrap_or_else(|_| PathBuf::from("cortex.toml")),
    ];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("cortex/cortex.toml"));
    }
    paths.push(PathBuf::from("/etc/cortex/cortex.toml"));
    paths
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    Some((path.display().to_string(), content))
}
