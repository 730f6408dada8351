// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process memory for the Cortex engine.
//!
//! Provides the three-tier cache that keeps hot contexts cheap to reach and
//! the compression engine that shrinks context payloads before they are
//! written to the durable store.

pub mod compression;
pub mod tiered;

pub use compression::{Codec, CompressionEngine, DeflateCodec};
pub use tiered::{MemoryRecord, MemoryTier, TierStats, TieredMemory};
