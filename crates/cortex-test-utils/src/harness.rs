// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete [`Runtime`] over an in-memory store
//! (or a temp SQLite database) and provides `exchange()` to drive a full
//! request/response round trip in tests.

use std::sync::Arc;

use cortex_config::model::CortexConfig;
use cortex_core::{Context, CortexError, DurableStore, Request, Response};
use cortex_rules::builtin;
use cortex_rules::{FnRuleSetFactory, RuleOutcome, RuleSet, RuleSetCatalog};
use cortex_runtime::Runtime;
use cortex_storage::MemoryStore;

/// Builds a catalog serving fixed rule sets. Each load hands out the same
/// rule instances, so invocation counters survive reloads.
pub fn catalog_of(sets: impl IntoIterator<Item = RuleSet>) -> RuleSetCatalog {
    let mut catalog = RuleSetCatalog::new();
    for set in sets {
        catalog.register(Arc::new(FnRuleSetFactory::new(move || set.clone())));
    }
    catalog
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: CortexConfig,
    catalog: Option<RuleSetCatalog>,
    store: Option<Arc<dyn DurableStore>>,
    sqlite: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: CortexConfig::default(),
            catalog: None,
            store: None,
            sqlite: false,
        }
    }

    /// Use a custom configuration instead of the defaults.
    pub fn with_config(mut self, config: CortexConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom rule catalog instead of the built-in one.
    pub fn with_catalog(mut self, catalog: RuleSetCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use the given durable store.
    pub fn with_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Back the runtime with a SQLite database in a temp directory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Build the test harness.
    pub async fn build(mut self) -> Result<TestHarness, CortexError> {
        let mut temp_dir = None;
        let store: Arc<dyn DurableStore> = match self.store.take() {
            Some(store) => store,
            None if self.sqlite => {
                let dir = tempfile::TempDir::new().map_err(CortexError::storage)?;
                self.config.storage.backend = "sqlite".to_string();
                self.config.storage.database_path =
                    dir.path().join("test.db").to_string_lossy().into_owned();
                let store = cortex_storage::open_store(&self.config.storage).await?;
                temp_dir = Some(dir);
                store
            }
            None => Arc::new(MemoryStore::new()),
        };

        let catalog = self.catalog.unwrap_or_else(builtin::catalog);
        let runtime = Runtime::with_store(store.clone(), catalog, &self.config).await?;

        Ok(TestHarness {
            runtime,
            store,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment around one [`Runtime`].
pub struct TestHarness {
    pub runtime: Runtime,
    /// The durable store the runtime writes through to.
    pub store: Arc<dyn DurableStore>,
    pub config: CortexConfig,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new test harness builder.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one full round trip: process the request, then record it with
    /// the given response text.
    pub async fn exchange(
        &self,
        session_id: &str,
        request: &str,
        response: &str,
    ) -> Result<(RuleOutcome, Context), CortexError> {
        let request = Request::new(request);
        let outcome = self.runtime.process(session_id, &request).await?;
        let context = self
            .runtime
            .complete(session_id, &outcome.request, &Response::new(response))
            .await?;
        Ok((outcome, context))
    }

    /// Raw JSON stored under `key`, if any.
    pub async fn stored(&self, key: &str) -> Result<Option<serde_json::Value>, CortexError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
