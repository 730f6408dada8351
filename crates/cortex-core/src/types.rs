// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the memory, context, and rule crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Summary text given to a context that has never seen an interaction.
pub const NEW_CONTEXT_SUMMARY: &str = "New context created";

/// Health status reported by durable store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is fully operational.
    Healthy,
    /// Store is operational but experiencing issues.
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}

/// An inbound request flowing through the rule pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier for this request.
    pub id: String,
    /// Textual content the request carries.
    pub content: String,
    /// Free-form attributes attached by callers and rules.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Request {
    /// Creates a request with a fresh id and no attributes.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// The response produced for a request by whatever sits downstream of the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,
    /// Textual content of the response.
    pub content: String,
}

impl Response {
    /// Creates a response with a fresh id.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
        }
    }
}

/// One request/response exchange recorded in a session's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub request: Request,
    pub response: Response,
    /// Short description produced by the configured summarizer.
    pub summary: String,
}

/// Decoded per-session data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextData {
    pub interactions: Vec<Interaction>,
    pub user_preferences: BTreeMap<String, serde_json::Value>,
    pub knowledge_base: BTreeMap<String, serde_json::Value>,
    pub entity_recognition: BTreeMap<String, u64>,
}

/// Size-reduction level applied to a persisted context payload.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
#[strum(serialize_all = "snake_case")]
pub enum CompressionLevel {
    /// Payload stored as plain JSON.
    #[default]
    Uncompressed,
    /// Cheapest encoding, used for small-to-medium payloads.
    Light,
    Medium,
    /// Most aggressive encoding, used for the largest payloads.
    Heavy,
}

impl CompressionLevel {
    /// All levels in increasing order of aggressiveness.
    pub const ALL: [CompressionLevel; 4] = [
        CompressionLevel::Uncompressed,
        CompressionLevel::Light,
        CompressionLevel::Medium,
        CompressionLevel::Heavy,
    ];

    /// Numeric level (0 = none, 3 = most aggressive).
    pub fn as_u8(self) -> u8 {
        match self {
            CompressionLevel::Uncompressed => 0,
            CompressionLevel::Light => 1,
            CompressionLevel::Medium => 2,
            CompressionLevel::Heavy => 3,
        }
    }

    /// Whether the payload under this level is an encoded blob.
    pub fn is_compressed(self) -> bool {
        self != CompressionLevel::Uncompressed
    }
}

impl From<CompressionLevel> for u8 {
    fn from(level: CompressionLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionLevel::Uncompressed),
            1 => Ok(CompressionLevel::Light),
            2 => Ok(CompressionLevel::Medium),
            3 => Ok(CompressionLevel::Heavy),
            other => Err(format!("compression level must be 0-3, got {other}")),
        }
    }
}

/// Size and compression bookkeeping for a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    pub compression_level: CompressionLevel,
    /// Byte length of the serialized, uncompressed data.
    pub original_size: usize,
    /// Byte length of the payload actually persisted.
    pub compressed_size: usize,
    /// Derived human-readable description of the context.
    pub summary: String,
}

impl Default for ContextMetadata {
    fn default() -> Self {
        Self {
            compression_level: CompressionLevel::Uncompressed,
            original_size: 0,
            compressed_size: 0,
            summary: NEW_CONTEXT_SUMMARY.to_string(),
        }
    }
}

/// The accumulated, decoded state of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub session_id: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub data: ContextData,
    pub metadata: ContextMetadata,
}

impl Context {
    /// Creates an empty context for a session seen for the first time.
    pub fn fresh(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            created: now,
            last_updated: now,
            data: ContextData::default(),
            metadata: ContextMetadata::default(),
        }
    }

    /// Prefix of every context key in the durable store.
    pub const KEY_PREFIX: &'static str = "context:";

    /// Durable store key for a session's context.
    pub fn storage_key(session_id: &str) -> String {
        format!("{}{session_id}", Self::KEY_PREFIX)
    }
}

/// Payload of a persisted context: plain data or an opaque encoded blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextPayload {
    /// Encoded blob; must be decoded with the level recorded in the metadata.
    Encoded(String),
    Plain(ContextData),
}

/// The persisted form of a [`Context`].
///
/// Only this form may carry an encoded payload; a [`Context`] is always
/// decoded. `metadata.compression_level > 0` iff `data` is
/// [`ContextPayload::Encoded`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContext {
    pub id: String,
    pub session_id: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub data: ContextPayload,
    pub metadata: ContextMetadata,
}
