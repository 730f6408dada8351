// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the request pipeline.
//!
//! Each test builds an isolated runtime through `TestHarness` or
//! `Runtime::open`. Tests are independent and order-insensitive.

use std::sync::Arc;

use cortex_config::model::CortexConfig;
use cortex_core::{CompressionLevel, Context, DurableStore, HealthStatus, Request, Response};
use cortex_runtime::Runtime;
use cortex_test_utils::{FailingStore, TestHarness};
use serde_json::json;

// ---- Session lifecycle ----

#[tokio::test]
async fn fresh_session_starts_empty() {
    let harness = TestHarness::builder().build().await.unwrap();
    let outcome = harness
        .runtime
        .process("new-session", &Request::new("hello"))
        .await
        .unwrap();

    assert!(outcome.context.data.interactions.is_empty());
    assert_eq!(
        outcome.context.metadata.compression_level,
        CompressionLevel::Uncompressed
    );
    assert!(outcome.loaded.is_empty());
}

#[tokio::test]
async fn large_exchanges_compress_heavily() {
    let harness = TestHarness::builder().build().await.unwrap();
    let big = "the quick brown fox jumps over the lazy dog ".repeat(1_200);
    assert!(big.len() > 50_000);

    harness.exchange("s", &big, "noted").await.unwrap();
    let (_, context) = harness.exchange("s", &big, "noted").await.unwrap();

    assert_eq!(context.metadata.compression_level, CompressionLevel::Heavy);
    assert!(context.metadata.compressed_size < context.metadata.original_size);

    let stored = harness
        .stored(&Context::storage_key("s"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["metadata"]["compressionLevel"], json!(3));
    assert!(stored["data"].is_string());
}

#[tokio::test]
async fn matching_rule_sets_load_once() {
    let harness = TestHarness::builder().build().await.unwrap();

    let (first, _) = harness
        .exchange("s", "Please implement a tokenizer", "done")
        .await
        .unwrap();
    assert!(first.triggers.contains("code_implementation"));
    assert_eq!(first.loaded, ["code_quality"]);

    let (second, _) = harness
        .exchange("s", "Now implement the parser", "done")
        .await
        .unwrap();
    assert!(second.loaded.is_empty());
    assert!(
        second
            .applied
            .contains(&"code_quality:coding_guidelines".to_string())
    );
}

#[tokio::test]
async fn learned_preferences_shape_later_requests() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .exchange("s", "I prefer Rust for everything", "Got it")
        .await
        .unwrap();

    let outcome = harness
        .runtime
        .process("s", &Request::new("implement a cache"))
        .await
        .unwrap();

    assert_eq!(
        outcome.request.attributes["preferences"],
        json!({"language": "rust"})
    );
    assert!(
        outcome.request.attributes["guidelines"]
            .as_array()
            .unwrap()
            .contains(&json!("Follow idiomatic rust conventions"))
    );
    assert!(outcome.request.attributes.contains_key("context_summary"));
}

#[tokio::test]
async fn sessions_are_isolated() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.exchange("a", "I prefer Python", "ok").await.unwrap();
    harness.exchange("b", "hello", "hi").await.unwrap();

    let b = harness.runtime.contexts().get_context("b").await.unwrap();
    assert!(b.data.user_preferences.is_empty());
    assert_eq!(b.data.interactions.len(), 1);
}

#[tokio::test]
async fn whitespace_is_normalized_before_recording() {
    let harness = TestHarness::builder().build().await.unwrap();
    let (outcome, context) = harness
        .exchange("s", "  line one  \n\n\n\nline two  ", "ok")
        .await
        .unwrap();
    assert_eq!(outcome.request.content, "line one\n\nline two");
    assert_eq!(
        context.data.interactions[0].request.content,
        "line one\n\nline two"
    );
}

// ---- Feedback ----

#[tokio::test]
async fn feedback_is_persisted() {
    let harness = TestHarness::builder().build().await.unwrap();
    let entry = cortex_rules::FeedbackEntry::new(0.2).for_rule("core:session_summary");
    harness.runtime.engine().record_feedback(&entry).await.unwrap();

    let stored = harness.stored("feedback").await.unwrap().unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["ruleId"], json!("core:session_summary"));
    assert!(harness.stored("rule_effectiveness").await.unwrap().is_some());
}

// ---- Backends and health ----

#[tokio::test]
async fn sqlite_backed_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CortexConfig::default();
    config.storage.backend = "sqlite".to_string();
    config.storage.database_path = dir.path().join("cortex.db").to_string_lossy().into_owned();

    {
        let runtime = Runtime::open(&config).await.unwrap();
        let request = Request::new("remember this");
        runtime.process("s", &request).await.unwrap();
        runtime
            .complete("s", &request, &Response::new("remembered"))
            .await
            .unwrap();
    }

    let runtime = Runtime::open(&config).await.unwrap();
    let context = runtime.contexts().get_context("s").await.unwrap();
    assert_eq!(context.data.interactions.len(), 1);
    assert_eq!(context.data.interactions[0].response.content, "remembered");
}

#[tokio::test]
async fn memory_backend_opens() {
    let mut config = CortexConfig::default();
    config.storage.backend = "memory".to_string();
    let runtime = Runtime::open(&config).await.unwrap();
    assert_eq!(runtime.store().name(), "memory");
    assert_eq!(runtime.health().await, HealthStatus::Healthy);
}

#[tokio::test]
async fn unknown_backend_is_rejected() {
    let mut config = CortexConfig::default();
    config.storage.backend = "redis".to_string();
    assert!(Runtime::open(&config).await.is_err());
}

#[tokio::test]
async fn store_outage_degrades_gracefully() {
    let store = Arc::new(FailingStore::new().failing_gets().failing_puts());
    let harness = TestHarness::builder()
        .with_store(store.clone())
        .build()
        .await
        .unwrap();

    let (outcome, context) = harness
        .exchange("s", "implement retries", "ok")
        .await
        .unwrap();
    assert_eq!(outcome.loaded, ["code_quality"]);
    assert_eq!(context.data.interactions.len(), 1);
    assert!(matches!(harness.runtime.health().await, HealthStatus::Unhealthy(_)));
}
