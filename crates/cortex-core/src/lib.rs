// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cortex context and rule engine.
//!
//! This crate provides the shared data model (contexts, requests, stored
//! payloads), the error type, and the collaborator traits every other crate
//! in the workspace is written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CortexError;
pub use types::{
    CompressionLevel, Context, ContextData, ContextMetadata, ContextPayload, HealthStatus,
    Interaction, Request, Response, StoredContext,
};

pub use traits::{DurableStore, ImportancePredicate, Summarizer, TriggerClassifier};
