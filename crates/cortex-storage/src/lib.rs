// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store adapters for the Cortex engine.
//!
//! Provides a WAL-mode SQLite store with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`, an in-memory store,
//! and [`CappedLog`] for the bounded `feedback` / `metrics:<category>` arrays.

pub mod capped;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use cortex_config::model::StorageConfig;
use cortex_core::{CortexError, DurableStore};

pub use capped::CappedLog;
pub use database::Database;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Opens the store selected by `storage.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn DurableStore>, CortexError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sqlite" => Ok(Arc::new(SqliteStore::open(config).await?)),
        other => Err(CortexError::Config(format!(
            "unknown storage backend `{other}`"
        ))),
    }
}
