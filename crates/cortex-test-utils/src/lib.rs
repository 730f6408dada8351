// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cortex integration tests.
//!
//! Provides store doubles, scripted rules and a test harness for fast,
//! deterministic tests without a database on disk.
//!
//! # Components
//!
//! - [`FailingStore`] - Durable store whose reads and writes can be made to fail
//! - [`RecordingStore`] - Durable store that logs every write
//! - [`GatedStore`] - Durable store that can pause a read mid-flight
//! - [`ScriptedRule`] - Rule with a fixed, scripted behavior
//! - [`TestHarness`] - A runtime over an in-memory or temp SQLite store

pub mod harness;
pub mod mock_rules;
pub mod mock_store;

pub use harness::{TestHarness, TestHarnessBuilder, catalog_of};
pub use mock_rules::{Script, ScriptedRule, TRACE_ATTRIBUTE};
pub use mock_store::{FailingStore, GatedStore, RecordingStore};
