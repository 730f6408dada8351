// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cortex context and rule engine.

use thiserror::Error;

/// The primary error type used across all Cortex traits and core operations.
///
/// Most degraded paths (store outages, corrupt payloads, failing rules) are
/// logged and absorbed by the callers; this type is what travels when an
/// operation genuinely has to report failure.
#[derive(Debug, Error)]
pub enum CortexError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (database connection, query failure, I/O).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// JSON encoding or decoding of a stored value failed.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// A compression codec could not encode or decode a payload.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// The requested rule set is not known to the catalog.
    #[error("rule set not found: {name}")]
    RuleSetNotFound { name: String },

    /// A rule failed while executing.
    #[error("rule {rule_id} failed: {message}")]
    RuleExecution { rule_id: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CortexError {
    /// Wraps any error as a [`CortexError::Storage`].
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CortexError::Storage {
            source: Box::new(err),
        }
    }
}
