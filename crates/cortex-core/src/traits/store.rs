// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable key-value store contract.

use async_trait::async_trait;

use crate::error::CortexError;
use crate::types::HealthStatus;

/// An externally supplied durable string key-value store.
///
/// No transactions and no atomicity across keys. An absent key is
/// `Ok(None)`, never an error.
#[async_trait]
pub trait DurableStore: Send + Sync + 'static {
    /// Returns the human-readable name of this store.
    fn name(&self) -> &str;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CortexError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<(), CortexError>;

    /// Performs a health check and returns the store's current status.
    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        Ok(HealthStatus::Healthy)
    }
}
