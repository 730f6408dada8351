// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded JSON-array logs stored under a single durable key.
//!
//! Used for the `feedback` and `metrics:<category>` keys. Each append is a
//! read-modify-write of the whole array, serialized per log instance; the
//! oldest entries are dropped once the cap is exceeded.

use std::sync::Arc;

use cortex_core::{CortexError, DurableStore};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

/// An append-only, FIFO-trimmed JSON array under one key.
pub struct CappedLog {
    store: Arc<dyn DurableStore>,
    key: String,
    cap: usize,
    write_lock: Mutex<()>,
}

impl CappedLog {
    pub fn new(store: Arc<dyn DurableStore>, key: impl Into<String>, cap: usize) -> Self {
        Self {
            store,
            key: key.into(),
            cap: cap.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// The durable key this log writes to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Appends `entry`, trims to the cap, and returns the resulting length.
    pub async fn append(&self, entry: Value) -> Result<usize, CortexError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries().await?;
        entries.push(entry);
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }
        let encoded = serde_json::to_string(&entries)?;
        self.store.put(&self.key, &encoded).await?;
        Ok(entries.len())
    }

    /// Reads all entries, oldest first. Absent or unreadable values are empty.
    pub async fn entries(&self) -> Result<Vec<Value>, CortexError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding unreadable log value");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn absent_key_reads_as_empty() {
        let log = CappedLog::new(Arc::new(MemoryStore::new()), "feedback", 3);
        assert!(log.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trims_oldest_entries_past_cap() {
        let store = Arc::new(MemoryStore::new());
        let log = CappedLog::new(store.clone(), "metrics:test", 3);
        for i in 0..5 {
            log.append(json!(i)).await.unwrap();
        }
        assert_eq!(log.entries().await.unwrap(), vec![json!(2), json!(3), json!(4)]);

        let raw = store.get("metrics:test").await.unwrap().unwrap();
        assert_eq!(raw, "[2,3,4]");
    }

    #[tokio::test]
    async fn corrupt_value_is_replaced() {
        let store = Arc::new(MemoryStore::new());
        store.put("feedback", "{not an array").await.unwrap();
        let log = CappedLog::new(store, "feedback", 10);
        assert_eq!(log.append(json!({"score": 1.0})).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let log = Arc::new(CappedLog::new(Arc::new(MemoryStore::new()), "feedback", 100));
        let mut handles = Vec::new();
        for i in 0..20 {
            let log = log.clone();
            handles.push(tokio::spawn(async move { log.append(json!(i)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(log.entries().await.unwrap().len(), 20);
    }
}
