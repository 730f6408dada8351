// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end request pipeline for the Cortex engine.
//!
//! A [`Runtime`] resolves a session's context through the
//! [`ContextStore`], lets the [`RuleEngine`] derive triggers, load matching
//! rule sets and apply the active rules, and records the finished exchange
//! back into the context.

use std::sync::Arc;

use cortex_config::model::CortexConfig;
use cortex_context::ContextStore;
use cortex_core::{Context, CortexError, DurableStore, HealthStatus, Request, Response};
use cortex_rules::builtin;
use cortex_rules::{RuleEngine, RuleOutcome, RuleSetCatalog};
use tracing::{debug, info, warn};

/// The composed context store and rule engine sharing one durable store.
pub struct Runtime {
    store: Arc<dyn DurableStore>,
    contexts: ContextStore,
    engine: RuleEngine,
}

impl Runtime {
    /// Opens the configured durable store and builds a runtime over the
    /// built-in rule catalog.
    pub async fn open(config: &CortexConfig) -> Result<Self, CortexError> {
        let store = cortex_storage::open_store(&config.storage).await?;
        Self::with_store(store, builtin::catalog(), config).await
    }

    /// Builds a runtime over an existing store and catalog.
    pub async fn with_store(
        store: Arc<dyn DurableStore>,
        catalog: RuleSetCatalog,
        config: &CortexConfig,
    ) -> Result<Self, CortexError> {
        let contexts = ContextStore::new(store.clone(), config);
        let engine = RuleEngine::new(store.clone(), catalog, config);
        Self::assemble(store, contexts, engine).await
    }

    /// Initializes `engine` and wraps the parts. Use this when the context
    /// store or engine needs custom collaborators.
    pub async fn assemble(
        store: Arc<dyn DurableStore>,
        contexts: ContextStore,
        engine: RuleEngine,
    ) -> Result<Self, CortexError> {
        engine.initialize().await?;
        info!(store = store.name(), "runtime ready");
        Ok(Self {
            store,
            contexts,
            engine,
        })
    }

    /// Resolves the session's context and runs the rule pipeline over
    /// `request`.
    pub async fn process(
        &self,
        session_id: &str,
        request: &Request,
    ) -> Result<RuleOutcome, CortexError> {
        let context = self.contexts.get_context(session_id).await?;
        let outcome = self.engine.process(request, &context).await;
        debug!(
            session_id,
            triggers = ?outcome.triggers,
            applied = outcome.applied.len(),
            failed = outcome.failed.len(),
            modified = outcome.modified,
            "request processed"
        );
        Ok(outcome)
    }

    /// Records the exchange once the downstream response is known.
    pub async fn complete(
        &self,
        session_id: &str,
        request: &Request,
        response: &Response,
    ) -> Result<Context, CortexError> {
        self.contexts
            .update_context(session_id, request, response)
            .await
    }

    /// Health of the underlying durable store. A failing check is reported
    /// as unhealthy rather than returned as an error.
    pub async fn health(&self) -> HealthStatus {
        match self.store.health_check().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "store health check failed");
                HealthStatus::Unhealthy(e.to_string())
            }
        }
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }
}
