// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the core depends on.
//!
//! The durable store is async (it is the only suspension point of the core);
//! the classifiers are synchronous and must be cheap.

pub mod classify;
pub mod store;

pub use classify::{ImportancePredicate, Summarizer, TriggerClassifier};
pub use store::DurableStore;
