// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Three-tier in-process cache with promotion on access and least-used eviction.
//!
//! Lookups probe short-term, then working, then long-term memory. Frequently
//! read records are copied one tier up; a tier over capacity evicts its
//! records with the fewest accesses, oldest first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cortex_config::model::MemoryConfig;
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::debug;

/// One of the three capacity-bounded caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    ShortTerm,
    Working,
    LongTerm,
}

impl MemoryTier {
    /// Probe order used by [`TieredMemory::retrieve`].
    pub const PROBE_ORDER: [MemoryTier; 3] =
        [MemoryTier::ShortTerm, MemoryTier::Working, MemoryTier::LongTerm];
}

/// A cached value and its usage bookkeeping.
#[derive(Debug, Clone)]
pub struct MemoryRecord<V> {
    pub key: String,
    pub payload: V,
    /// Last write or promotion time.
    pub timestamp: DateTime<Utc>,
    /// Hits on this record since it entered its current tier.
    pub access_count: u64,
    /// Insertion order; breaks exact timestamp ties during eviction.
    sequence: u64,
}

/// Cache counters for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub short_term: usize,
    pub working: usize,
    pub long_term: usize,
    pub hits: u64,
    pub misses: u64,
    pub promotions: u64,
    pub evictions: u64,
}

/// Three independent maps keyed by string.
///
/// Promotion copies rather than moves, so one key can be held by two tiers
/// at once; each copy keeps its own access count.
#[derive(Debug)]
pub struct TieredMemory<V> {
    short_term: HashMap<String, MemoryRecord<V>>,
    working: HashMap<String, MemoryRecord<V>>,
    long_term: HashMap<String, MemoryRecord<V>>,
    limits: MemoryConfig,
    next_sequence: u64,
    stats: TierStats,
}

impl<V: Clone> TieredMemory<V> {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            short_term: HashMap::new(),
            working: HashMap::new(),
            long_term: HashMap::new(),
            limits: config.clone(),
            next_sequence: 0,
            stats: TierStats::default(),
        }
    }

    fn tier(&self, tier: MemoryTier) -> &HashMap<String, MemoryRecord<V>> {
        match tier {
            MemoryTier::ShortTerm => &self.short_term,
            MemoryTier::Working => &self.working,
            MemoryTier::LongTerm => &self.long_term,
        }
    }

    fn tier_mut(&mut self, tier: MemoryTier) -> &mut HashMap<String, MemoryRecord<V>> {
        match tier {
            MemoryTier::ShortTerm => &mut self.short_term,
            MemoryTier::Working => &mut self.working,
            MemoryTier::LongTerm => &mut self.long_term,
        }
    }

    /// Configured capacity of a tier.
    pub fn capacity(&self, tier: MemoryTier) -> usize {
        match tier {
            MemoryTier::ShortTerm => self.limits.short_term_capacity,
            MemoryTier::Working => self.limits.working_capacity,
            MemoryTier::LongTerm => self.limits.long_term_capacity,
        }
    }

    /// Number of records currently held by a tier.
    pub fn len(&self, tier: MemoryTier) -> usize {
        self.tier(tier).len()
    }

    /// Inserts or overwrites `key` in `tier` with a zero access count, then
    /// enforces the tier's capacity. Returns the keys evicted from `tier`.
    pub fn store(&mut self, tier: MemoryTier, key: impl Into<String>, value: V) -> Vec<String> {
        let key = key.into();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let record = MemoryRecord {
            key: key.clone(),
            payload: value,
            timestamp: Utc::now(),
            access_count: 0,
            sequence,
        };
        self.tier_mut(tier).insert(key, record);
        let limit = self.capacity(tier);
        self.enforce_memory_limits(tier, limit)
    }

    /// Looks `key` up in probe order, counting the hit on the owning record.
    ///
    /// A working-memory hit past the working threshold is copied into
    /// short-term memory; a long-term hit past the long-term threshold is
    /// copied into working memory.
    pub fn retrieve(&mut self, key: &str) -> Option<V> {
        for tier in MemoryTier::PROBE_ORDER {
            let Some(record) = self.tier_mut(tier).get_mut(key) else {
                continue;
            };
            record.access_count += 1;
            let access_count = record.access_count;
            let payload = record.payload.clone();
            self.stats.hits += 1;

            let promote_to = match tier {
                MemoryTier::Working if access_count > self.limits.working_promotion_threshold => {
                    Some(MemoryTier::ShortTerm)
                }
                MemoryTier::LongTerm
                    if access_count > self.limits.long_term_promotion_threshold =>
                {
                    Some(MemoryTier::Working)
                }
                _ => None,
            };
            if let Some(target) = promote_to {
                debug!(key, from = %tier, to = %target, access_count, "promoting record");
                self.stats.promotions += 1;
                self.store(target, key, payload.clone());
            }
            return Some(payload);
        }
        self.stats.misses += 1;
        None
    }

    /// Reads a record from a single tier without counting an access.
    pub fn peek(&self, tier: MemoryTier, key: &str) -> Option<&MemoryRecord<V>> {
        self.tier(tier).get(key)
    }

    /// Drops `key` from every tier. Returns true if any tier held it.
    pub fn remove(&mut self, key: &str) -> bool {
        let mut removed = false;
        for tier in MemoryTier::PROBE_ORDER {
            removed |= self.tier_mut(tier).remove(key).is_some();
        }
        removed
    }

    /// Evicts least-used records until `tier` holds at most `limit`.
    ///
    /// Records are ranked by `(access_count, timestamp)` ascending and the
    /// lowest `len - limit` are deleted. Returns the evicted keys.
    pub fn enforce_memory_limits(&mut self, tier: MemoryTier, limit: usize) -> Vec<String> {
        let map = self.tier_mut(tier);
        if map.len() <= limit {
            return Vec::new();
        }
        let excess = map.len() - limit;

        let mut ranked: Vec<(u64, DateTime<Utc>, u64, String)> = map
            .values()
            .map(|r| (r.access_count, r.timestamp, r.sequence, r.key.clone()))
            .collect();
        ranked.sort();

        let evicted: Vec<String> = ranked
            .into_iter()
            .take(excess)
            .map(|(_, _, _, key)| key)
            .collect();
        for key in &evicted {
            map.remove(key);
        }

        self.stats.evictions += evicted.len() as u64;
        debug!(tier = %tier, evicted = evicted.len(), limit, "tier limit enforced");
        evicted
    }

    /// Current sizes and lifetime counters.
    pub fn stats(&self) -> TierStats {
        TierStats {
            short_term: self.short_term.len(),
            working: self.working.len(),
            long_term: self.long_term.len(),
            ..self.stats.clone()
        }
    }
}
