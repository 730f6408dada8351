// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store doubles.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cortex_core::{CortexError, DurableStore, HealthStatus};
use cortex_storage::MemoryStore;
use tokio::sync::Notify;

/// A [`MemoryStore`] whose reads and writes fail on demand.
///
/// Failures are injected per operation and can be toggled while a test
/// runs. Calls are counted whether or not they fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl FailingStore {
    /// Create a store that does not fail yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: every `get` fails.
    pub fn failing_gets(self) -> Self {
        self.set_fail_gets(true);
        self
    }

    /// Builder: every `put` fails.
    pub fn failing_puts(self) -> Self {
        self.set_fail_puts(true);
        self
    }

    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls seen so far.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `put` calls seen so far.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// The backing store, for seeding and inspecting values directly.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

fn injected(op: &str) -> CortexError {
    CortexError::storage(std::io::Error::other(format!("injected {op} failure")))
}

#[async_trait]
impl DurableStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CortexError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(injected("get"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CortexError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected("put"));
        }
        self.inner.put(key, value).await
    }

    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        let gets = self.fail_gets.load(Ordering::SeqCst);
        let puts = self.fail_puts.load(Ordering::SeqCst);
        Ok(match (gets, puts) {
            (false, false) => HealthStatus::Healthy,
            (true, true) => HealthStatus::Unhealthy("reads and writes failing".into()),
            (true, false) => HealthStatus::Degraded("reads failing".into()),
            (false, true) => HealthStatus::Degraded("writes failing".into()),
        })
    }
}

/// A [`MemoryStore`] that keeps an ordered log of every write.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(key, value)` written, oldest first.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Values written under `key`, oldest first.
    pub fn writes_to(&self, key: &str) -> Vec<String> {
        let values: Vec<String> = self
            .writes()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect();
        values
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl DurableStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CortexError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CortexError> {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((key.to_string(), value.to_string()));
        self.inner.put(key, value).await
    }
}

/// A [`MemoryStore`] that can hold one `get` after it has read its value.
///
/// Arm it with [`GatedStore::pause_next_get`], wait for the read with
/// [`GatedStore::paused`], then let it return with [`GatedStore::release`].
#[derive(Debug, Default)]
pub struct GatedStore {
    inner: MemoryStore,
    armed: AtomicBool,
    reached: Notify,
    released: Notify,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `get` reads its value, then waits for [`GatedStore::release`].
    pub fn pause_next_get(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once the armed `get` has read its value and is waiting.
    pub async fn paused(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl DurableStore for GatedStore {
    fn name(&self) -> &str {
        "gated"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CortexError> {
        let value = self.inner.get(key).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.released.notified().await;
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CortexError> {
        self.inner.put(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_store_toggles() {
        let store = FailingStore::new().failing_puts();
        assert!(store.put("k", "v").await.is_err());
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set_fail_puts(false);
        store.put("k", "v").await.unwrap();
        store.set_fail_gets(true);
        assert!(store.get("k").await.is_err());
        assert_eq!(store.put_calls(), 2);
        assert_eq!(store.get_calls(), 2);
        assert_eq!(
            store.health_check().await.unwrap(),
            HealthStatus::Degraded("reads failing".into())
        );
    }

    #[tokio::test]
    async fn recording_store_logs_writes() {
        let store = RecordingStore::new();
        store.put("a", "1").await.unwrap();
        store.put("b", "2").await.unwrap();
        store.put("a", "3").await.unwrap();
        assert_eq!(store.writes().len(), 3);
        assert_eq!(store.writes_to("a"), ["1", "3"]);
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn gated_store_holds_one_read() {
        let store = std::sync::Arc::new(GatedStore::new());
        store.put("k", "old").await.unwrap();
        store.pause_next_get();

        let reader = {
            let store = store.clone();
            tokio::spawn(async move { store.get("k").await.unwrap() })
        };
        store.paused().await;
        store.put("k", "new").await.unwrap();
        store.release();

        assert_eq!(reader.await.unwrap().as_deref(), Some("old"));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }
}
