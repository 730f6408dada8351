// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the context store: lifecycle, history trimming,
//! compression, re-tiering and degraded store behavior.

use std::sync::Arc;
use std::time::Duration;

use cortex_config::model::CortexConfig;
use cortex_context::ContextStore;
use cortex_core::{
    CompressionLevel, Context, ContextPayload, DurableStore, Request, Response, StoredContext,
};
use cortex_memory::MemoryTier;
use cortex_storage::MemoryStore;
use cortex_test_utils::{FailingStore, GatedStore, RecordingStore};
use serde_json::json;
use tracing_test::traced_test;

fn context_store(store: Arc<dyn DurableStore>) -> ContextStore {
    ContextStore::new(store, &CortexConfig::default())
}

async fn stored_context(store: &dyn DurableStore, session_id: &str) -> StoredContext {
    let raw = store
        .get(&Context::storage_key(session_id))
        .await
        .unwrap()
        .expect("context persisted");
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn fresh_session_gets_empty_persisted_context() {
    let store = Arc::new(MemoryStore::new());
    let contexts = context_store(store.clone());

    let context = contexts.get_context("s-1").await.unwrap();
    assert_eq!(context.session_id, "s-1");
    assert!(context.data.interactions.is_empty());
    assert_eq!(context.metadata.compression_level, CompressionLevel::Uncompressed);
    assert_eq!(contexts.placement("s-1"), Some(MemoryTier::Working));

    let stored = stored_context(store.as_ref(), "s-1").await;
    assert_eq!(stored.id, context.id);
    assert!(matches!(stored.data, ContextPayload::Plain(_)));

    // A second read is served from the cache and is the same context.
    let again = contexts.get_context("s-1").await.unwrap();
    assert_eq!(again.id, context.id);
}

#[tokio::test]
async fn history_keeps_first_five_and_last_fifteen() {
    let contexts = context_store(Arc::new(MemoryStore::new()));
    let mut last = None;
    for i in 0..25 {
        let request = Request::new(format!("q{i}"));
        last = Some(
            contexts
                .update_context("s", &request, &Response::new(format!("a{i}")))
                .await
                .unwrap(),
        );
    }

    let context = last.unwrap();
    let requests: Vec<String> = context
        .data
        .interactions
        .iter()
        .map(|i| i.request.content.clone())
        .collect();
    let expected: Vec<String> = (0..5).chain(10..25).map(|i| format!("q{i}")).collect();
    assert_eq!(requests, expected);
    assert!(context.metadata.summary.starts_with("20 interactions"));
}

#[tokio::test]
async fn large_history_is_heavily_compressed_and_restored() {
    let store = Arc::new(MemoryStore::new());
    let contexts = context_store(store.clone());
    let big = "lorem ipsum dolor sit amet ".repeat(2_000);
    assert!(big.len() > 50_000);

    contexts.get_context("s").await.unwrap();
    contexts
        .update_context("s", &Request::new(big.clone()), &Response::new("ok"))
        .await
        .unwrap();
    let context = contexts
        .update_context("s", &Request::new(big.clone()), &Response::new("ok"))
        .await
        .unwrap();

    assert_eq!(context.metadata.compression_level, CompressionLevel::Heavy);
    assert!(context.metadata.compressed_size < context.metadata.original_size);
    assert_eq!(context.data.interactions.len(), 2);

    let stored = stored_context(store.as_ref(), "s").await;
    assert!(matches!(stored.data, ContextPayload::Encoded(_)));
    assert_eq!(stored.metadata, context.metadata);

    // Reading back from the durable store decodes the payload.
    assert!(contexts.forget_cached("s"));
    let reloaded = contexts.get_context("s").await.unwrap();
    assert_eq!(reloaded.data, context.data);
    assert_eq!(contexts.placement("s"), Some(MemoryTier::LongTerm));
}

#[tokio::test]
async fn extractors_enrich_context() {
    let contexts = context_store(Arc::new(MemoryStore::new()));
    let context = contexts
        .update_context(
            "s",
            &Request::new("I prefer Rust. Why is my `parse_config` database query slow?"),
            &Response::new("Add an index to the table."),
        )
        .await
        .unwrap();

    assert_eq!(context.data.user_preferences["language"], json!("rust"));
    assert!(context.data.knowledge_base.contains_key("database"));
    assert!(context.data.knowledge_base.contains_key("performance"));
    assert_eq!(context.data.entity_recognition.get("parse_config"), Some(&1));
    assert!(context.metadata.summary.contains("preferences: language"));
}

#[tokio::test]
async fn updates_are_placed_by_recency_and_importance() {
    let contexts = context_store(Arc::new(MemoryStore::new()));

    contexts
        .update_context("calm", &Request::new("hi"), &Response::new("hello"))
        .await
        .unwrap();
    assert_eq!(contexts.placement("calm"), Some(MemoryTier::Working));

    contexts
        .update_context(
            "urgent",
            &Request::new("production is broken, critical error"),
            &Response::new("rolling back"),
        )
        .await
        .unwrap();
    assert_eq!(contexts.placement("urgent"), Some(MemoryTier::ShortTerm));
}

#[tokio::test]
async fn cached_reads_see_latest_update() {
    let contexts = context_store(Arc::new(MemoryStore::new()));
    contexts
        .update_context("s", &Request::new("urgent crash"), &Response::new("ok"))
        .await
        .unwrap();
    contexts
        .update_context("s", &Request::new("thanks"), &Response::new("np"))
        .await
        .unwrap();

    let context = contexts.get_context("s").await.unwrap();
    assert_eq!(context.data.interactions.len(), 2);
}

#[tokio::test]
async fn forget_cached_reloads_from_durable_store() {
    let store = Arc::new(RecordingStore::new());
    let contexts = context_store(store.clone());
    contexts
        .update_context("s", &Request::new("hello"), &Response::new("hi"))
        .await
        .unwrap();
    assert!(!store.writes_to(&Context::storage_key("s")).is_empty());

    assert!(contexts.forget_cached("s"));
    assert_eq!(contexts.placement("s"), None);
    assert!(!contexts.forget_cached("s"));

    let reloaded = contexts.get_context("s").await.unwrap();
    assert_eq!(reloaded.data.interactions.len(), 1);
    assert_eq!(reloaded.data.interactions[0].request.content, "hello");
}

#[tokio::test]
async fn corrupt_stored_context_is_replaced() {
    let store = Arc::new(MemoryStore::new());
    store
        .put(&Context::storage_key("s"), "{ not json")
        .await
        .unwrap();
    let contexts = context_store(store.clone());

    let context = contexts.get_context("s").await.unwrap();
    assert!(context.data.interactions.is_empty());
    let stored = stored_context(store.as_ref(), "s").await;
    assert_eq!(stored.id, context.id);
}

#[tokio::test]
#[traced_test]
async fn read_failure_yields_transient_context() {
    let store = Arc::new(FailingStore::new().failing_gets());
    let contexts = context_store(store.clone());

    let context = contexts.get_context("s").await.unwrap();
    assert!(context.data.interactions.is_empty());
    assert_eq!(contexts.placement("s"), None);
    assert_eq!(store.put_calls(), 0);
    assert!(logs_contain("durable store read failed"));
}

#[tokio::test]
#[traced_test]
async fn update_after_read_failure_keeps_durable_history() {
    let store = Arc::new(FailingStore::new());
    let contexts = context_store(store.clone());
    for i in 0..5 {
        contexts
            .update_context("s", &Request::new(format!("q{i}")), &Response::new("a"))
            .await
            .unwrap();
    }
    assert!(contexts.forget_cached("s"));
    let writes_before = store.put_calls();

    store.set_fail_gets(true);
    let degraded = contexts
        .update_context("s", &Request::new("q5"), &Response::new("a"))
        .await
        .unwrap();
    assert_eq!(degraded.data.interactions.len(), 1);
    assert_eq!(contexts.placement("s"), None);
    assert_eq!(store.put_calls(), writes_before);
    assert!(logs_contain("update kept out of cache and store"));

    store.set_fail_gets(false);
    let recovered = contexts.get_context("s").await.unwrap();
    assert_eq!(recovered.data.interactions.len(), 5);
    let next = contexts
        .update_context("s", &Request::new("q6"), &Response::new("a"))
        .await
        .unwrap();
    assert_eq!(next.data.interactions.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_load_does_not_discard_concurrent_update() {
    let store = Arc::new(GatedStore::new());
    let contexts = Arc::new(context_store(store.clone()));
    contexts
        .update_context("s", &Request::new("q1"), &Response::new("a"))
        .await
        .unwrap();
    assert!(contexts.forget_cached("s"));

    store.pause_next_get();
    let reader = {
        let contexts = contexts.clone();
        tokio::spawn(async move { contexts.get_context("s").await.unwrap() })
    };
    store.paused().await;

    let writer = {
        let contexts = contexts.clone();
        tokio::spawn(async move {
            contexts
                .update_context("s", &Request::new("q2"), &Response::new("a"))
                .await
                .unwrap()
        })
    };
    // Give the update every chance to overtake the held read.
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.release();
    reader.await.unwrap();
    writer.await.unwrap();

    let context = contexts
        .update_context("s", &Request::new("q3"), &Response::new("a"))
        .await
        .unwrap();
    let requests: Vec<&str> = context
        .data
        .interactions
        .iter()
        .map(|i| i.request.content.as_str())
        .collect();
    assert_eq!(requests, ["q1", "q2", "q3"]);
}

#[tokio::test]
async fn write_failure_on_create_is_tolerated_by_default() {
    let store = Arc::new(FailingStore::new().failing_puts());
    let contexts = context_store(store.clone());

    let context = contexts.get_context("s").await.unwrap();
    assert_eq!(context.session_id, "s");
    assert_eq!(contexts.placement("s"), Some(MemoryTier::Working));
    assert_eq!(store.put_calls(), 1);
}

#[tokio::test]
async fn write_failure_on_create_propagates_when_required() {
    let mut config = CortexConfig::default();
    config.context.require_durable_create = true;
    let store = Arc::new(FailingStore::new().failing_puts());
    let contexts = ContextStore::new(store, &config);

    assert!(contexts.get_context("s").await.is_err());
    assert_eq!(contexts.placement("s"), None);
}

#[tokio::test]
async fn update_survives_write_failure() {
    let store = Arc::new(FailingStore::new().failing_puts());
    let contexts = context_store(store.clone());

    let context = contexts
        .update_context("s", &Request::new("q"), &Response::new("a"))
        .await
        .unwrap();
    assert_eq!(context.data.interactions.len(), 1);
    assert!(store.inner().is_empty());

    // The cached copy still carries the update.
    let cached = contexts.get_context("s").await.unwrap();
    assert_eq!(cached.data.interactions.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_of_one_session_are_serialized() {
    let store = Arc::new(MemoryStore::new());
    let contexts = Arc::new(context_store(store.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let contexts = contexts.clone();
            tokio::spawn(async move {
                contexts
                    .update_context("s", &Request::new(format!("q{i}")), &Response::new("a"))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let context = contexts.get_context("s").await.unwrap();
    assert_eq!(context.data.interactions.len(), 16);

    let stored = stored_context(store.as_ref(), "s").await;
    match stored.data {
        ContextPayload::Plain(data) => assert_eq!(data.interactions.len(), 16),
        ContextPayload::Encoded(_) => {
            assert!(stored.metadata.compression_level > CompressionLevel::Uncompressed)
        }
    }
}

#[tokio::test]
async fn cache_stats_track_sessions() {
    let contexts = context_store(Arc::new(MemoryStore::new()));
    contexts.get_context("a").await.unwrap();
    contexts.get_context("b").await.unwrap();
    contexts.get_context("a").await.unwrap();

    let stats = contexts.cache_stats();
    assert_eq!(stats.tracked_sessions, 2);
    assert_eq!(stats.tiers.working, 2);
    assert_eq!(stats.tiers.hits, 1);
}
