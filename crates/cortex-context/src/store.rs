// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session context store.
//!
//! Reads go through the tiered cache, then the durable store, and finally
//! synthesize a fresh context. Every update is written through to the durable
//! store, which stays the source of truth; the cache only keeps hot contexts
//! cheap to reach.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use cortex_config::model::{ContextConfig, CortexConfig};
use cortex_core::{
    Context, CortexError, DurableStore, ImportancePredicate, Interaction, Request, Response,
    StoredContext, Summarizer,
};
use cortex_memory::{CompressionEngine, MemoryTier, TierStats, TieredMemory};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::classify::{self, MarkerImportance, TruncatingSummarizer};
use crate::extract::{ContextExtractor, default_extractors};

/// Cache diagnostics reported by [`ContextStore::cache_stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub tiers: TierStats,
    /// Sessions with a known cache placement.
    pub tracked_sessions: usize,
}

/// Keeps the first `head` items and the most recent `max - head` once
/// `items` grows past `max`.
pub fn trim_interactions<T>(items: &mut Vec<T>, max: usize, head: usize) {
    if items.len() <= max {
        return;
    }
    let head = head.min(max);
    let tail = max - head;
    let cut_end = items.len() - tail;
    items.drain(head..cut_end);
}

/// Where [`ContextStore::resolve`] found a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Cached,
    Durable,
    Created,
    /// The durable read failed; the context is a stand-in.
    Transient,
}

/// Owns the lifecycle of every session's [`Context`].
pub struct ContextStore {
    store: Arc<dyn DurableStore>,
    memory: Mutex<TieredMemory<Context>>,
    /// Session id to the tier its context was last placed in.
    placements: DashMap<String, MemoryTier>,
    /// Serializes read-modify-write cycles per session.
    session_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    compression: CompressionEngine,
    summarizer: Arc<dyn Summarizer>,
    importance: Arc<dyn ImportancePredicate>,
    extractors: Vec<Box<dyn ContextExtractor>>,
    config: ContextConfig,
}

impl ContextStore {
    /// Creates a store with the default summarizer, importance markers and
    /// extractors.
    pub fn new(store: Arc<dyn DurableStore>, config: &CortexConfig) -> Self {
        Self {
            store,
            memory: Mutex::new(TieredMemory::new(&config.memory)),
            placements: DashMap::new(),
            session_locks: DashMap::new(),
            compression: CompressionEngine::new(&config.compression),
            summarizer: Arc::new(TruncatingSummarizer::new(config.context.summary_chars)),
            importance: Arc::new(MarkerImportance::new(&config.context.urgency_markers)),
            extractors: default_extractors(),
            config: config.context.clone(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_importance(mut self, importance: Arc<dyn ImportancePredicate>) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_compression(mut self, compression: CompressionEngine) -> Self {
        self.compression = compression;
        self
    }

    /// Replaces the extractor set. An empty set disables extraction.
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn ContextExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    fn memory(&self) -> MutexGuard<'_, TieredMemory<Context>> {
        // Tier operations never leave the cache half-updated, so a poisoned
        // lock is still safe to use.
        self.memory.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Caches `context` in `tier` and drops placements of sessions that no
    /// tier holds any more.
    ///
    /// Older copies in other tiers are discarded first; a lookup probes
    /// short-term memory before the others and must not see a stale version.
    fn cache(&self, tier: MemoryTier, context: &Context) {
        let key = Context::storage_key(&context.session_id);
        let dropped: Vec<String> = {
            let mut memory = self.memory();
            memory.remove(&key);
            memory
                .store(tier, key, context.clone())
                .into_iter()
                .filter(|evicted| {
                    MemoryTier::PROBE_ORDER
                        .iter()
                        .all(|t| memory.peek(*t, evicted).is_none())
                })
                .collect()
        };
        for evicted in dropped {
            if let Some(session_id) = evicted.strip_prefix(Context::KEY_PREFIX) {
                self.placements.remove(session_id);
            }
        }
        self.placements.insert(context.session_id.clone(), tier);
    }

    /// Resolves the context for `session_id`.
    ///
    /// Lookups go straight to the tiered cache; on a miss the durable store
    /// is read under the session lock, so a load can never replace a copy
    /// cached by a concurrent update. A session never seen before gets a
    /// fresh, empty context, which is a successful read. Durable store
    /// failures degrade to a fresh context that is neither cached nor
    /// persisted.
    pub async fn get_context(&self, session_id: &str) -> Result<Context, CortexError> {
        if let Some(context) = self.cached(session_id) {
            return Ok(context);
        }
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        let (context, _) = self.resolve(session_id).await?;
        Ok(context)
    }

    fn cached(&self, session_id: &str) -> Option<Context> {
        let context = self.memory().retrieve(&Context::storage_key(session_id))?;
        debug!(session_id, "context cache hit");
        Some(context)
    }

    /// Cache, then durable store, then a fresh context. Callers hold the
    /// session lock.
    async fn resolve(&self, session_id: &str) -> Result<(Context, Origin), CortexError> {
        if let Some(context) = self.cached(session_id) {
            return Ok((context, Origin::Cached));
        }
        self.placements.remove(session_id);

        let key = Context::storage_key(session_id);
        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<StoredContext>(&raw) {
                Ok(stored) => {
                    let context = self.compression.restore(stored);
                    debug!(
                        session_id,
                        level = %context.metadata.compression_level,
                        "context loaded from durable store"
                    );
                    self.cache(MemoryTier::LongTerm, &context);
                    return Ok((context, Origin::Durable));
                }
                Err(e) => {
                    warn!(session_id, error = %e, "stored context is unreadable, starting fresh");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(session_id, error = %e, "durable store read failed, using transient context");
                return Ok((Context::fresh(session_id), Origin::Transient));
            }
        }

        let context = Context::fresh(session_id);
        if let Err(e) = self.persist(&context).await {
            if self.config.require_durable_create {
                return Err(e);
            }
            warn!(session_id, error = %e, "failed to persist new context");
        }
        info!(session_id, "created new context");
        self.cache(MemoryTier::Working, &context);
        Ok((context, Origin::Created))
    }

    /// Records a request/response exchange in the session's context and
    /// writes the result through to the durable store.
    ///
    /// Concurrent updates of one session are serialized; different sessions
    /// proceed independently. A failed durable write is logged and the
    /// in-memory result is still returned. When the durable read failed the
    /// result is returned only: writing it would replace the stored history
    /// with a single interaction.
    pub async fn update_context(
        &self,
        session_id: &str,
        request: &Request,
        response: &Response,
    ) -> Result<Context, CortexError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let (mut context, origin) = self.resolve(session_id).await?;
        let previous_update = context.last_updated;
        let now = Utc::now();

        context.data.interactions.push(Interaction {
            timestamp: now,
            request: request.clone(),
            response: response.clone(),
            summary: self.summarizer.summarize(request, response),
        });
        for extractor in &self.extractors {
            extractor.extract(request, response, &mut context.data);
        }
        trim_interactions(
            &mut context.data.interactions,
            self.config.max_interactions,
            self.config.retained_head,
        );
        context.last_updated = now;
        context.metadata.summary = classify::describe(&context.data);

        let stored = self.compression.compress_if_needed(&context)?;
        context.metadata = stored.metadata.clone();

        let tier = classify::placement(
            self.is_recent(previous_update, now),
            classify::is_important(&self.config, self.importance.as_ref(), request, response),
        );
        if origin == Origin::Transient {
            warn!(session_id, "durable history unavailable, update kept out of cache and store");
            return Ok(context);
        }
        self.cache(tier, &context);

        if let Err(e) = self.put_stored(&stored).await {
            warn!(session_id, error = %e, "failed to persist context update");
        }

        metrics::counter!("cortex_context_updates_total").increment(1);
        debug!(
            session_id,
            %tier,
            interactions = context.data.interactions.len(),
            level = %context.metadata.compression_level,
            original_size = context.metadata.original_size,
            compressed_size = context.metadata.compressed_size,
            "context updated"
        );
        Ok(context)
    }

    fn is_recent(&self, previous: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // A timestamp from the future (clock skew) counts as recent.
        u64::try_from(now.signed_duration_since(previous).num_seconds())
            .map_or(true, |elapsed| elapsed < self.config.recent_window_secs)
    }

    async fn persist(&self, context: &Context) -> Result<(), CortexError> {
        let stored = self.compression.compress_if_needed(context)?;
        self.put_stored(&stored).await
    }

    async fn put_stored(&self, stored: &StoredContext) -> Result<(), CortexError> {
        let json = serde_json::to_string(stored)?;
        self.store
            .put(&Context::storage_key(&stored.session_id), &json)
            .await
    }

    /// Drops a session from every cache tier. The durable copy is kept.
    pub fn forget_cached(&self, session_id: &str) -> bool {
        let removed = self.memory().remove(&Context::storage_key(session_id));
        self.placements.remove(session_id);
        removed
    }

    /// Tier in which a session's context was last cached, if still cached.
    pub fn placement(&self, session_id: &str) -> Option<MemoryTier> {
        self.placements.get(session_id).map(|p| *p)
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            tiers: self.memory().stats(),
            tracked_sessions: self.placements.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_keeps_head_and_tail() {
        let mut items: Vec<u32> = (0..21).collect();
        trim_interactions(&mut items, 20, 5);
        let expected: Vec<u32> = (0..5).chain(6..21).collect();
        assert_eq!(items, expected);
    }

    #[test]
    fn trim_is_noop_under_cap() {
        let mut items: Vec<u32> = (0..20).collect();
        trim_interactions(&mut items, 20, 5);
        assert_eq!(items.len(), 20);
    }

    #[test]
    fn trim_handles_large_overflow() {
        let mut items: Vec<u32> = (0..100).collect();
        trim_interactions(&mut items, 20, 5);
        let expected: Vec<u32> = (0..5).chain(85..100).collect();
        assert_eq!(items, expected);
    }

    proptest::proptest! {
        #[test]
        fn trim_retains_first_and_last(len in 0usize..200) {
            let original: Vec<usize> = (0..len).collect();
            let mut items = original.clone();
            trim_interactions(&mut items, 20, 5);
            proptest::prop_assert!(items.len() <= 20);
            if len > 20 {
                let mut expected: Vec<usize> = original[..5].to_vec();
                expected.extend_from_slice(&original[len - 15..]);
                proptest::prop_assert_eq!(items, expected);
            } else {
                proptest::prop_assert_eq!(items, original);
            }
        }
    }
}
