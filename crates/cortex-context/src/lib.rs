// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session context lifecycle for the Cortex engine.
//!
//! The [`ContextStore`] resolves a session's [`Context`](cortex_core::Context)
//! through the tiered cache and the durable store, records each exchange,
//! runs the side-effect extractors, trims history, compresses, re-tiers and
//! persists the result.

pub mod classify;
pub mod extract;
pub mod store;

pub use classify::{MarkerImportance, TruncatingSummarizer, describe, placement};
pub use extract::{
    ContextExtractor, EntityExtractor, KnowledgeExtractor, PreferenceExtractor,
    default_extractors,
};
pub use store::{CacheStats, ContextStore, trim_interactions};
