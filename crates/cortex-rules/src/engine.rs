// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rule engine: trigger detection, on-demand loading, and prioritized,
//! fault-isolated rule application.
//!
//! Each rule runs on its own copy of the working target inside a spawned
//! task with a timeout. A rule's changes are committed only when it reports
//! success and a modification; an error, a reported failure, a panic or a
//! timeout discards them and the pipeline moves on to the next rule.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use cortex_config::model::CortexConfig;
use cortex_core::{Context, CortexError, DurableStore, Request, TriggerClassifier};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classifier::KeywordTriggerClassifier;
use crate::feedback::{FeedbackEntry, FeedbackLog, MetricSample, MetricsLog};
use crate::prioritization::{EffectivenessRecord, EffectivenessUpdate, RulePrioritizer};
use crate::registry::{RuleRegistry, RuleSetInfo};
use crate::rule::{ActiveRule, RuleTarget};
use crate::ruleset::RuleSetCatalog;

/// Request attribute through which callers can name triggers explicitly.
pub const TRIGGERS_ATTRIBUTE: &str = "triggers";

/// Metrics log category for per-request rule application samples.
pub const RULE_APPLICATION_METRIC: &str = "rule_application";

/// Result of running the active rules over a request and its context.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub request: Request,
    pub context: Context,
    /// True if any committed rule reported a modification.
    pub modified: bool,
    /// Ids of rules that ran successfully, in execution order.
    pub applied: Vec<String>,
    /// Ids of rules that failed, timed out or panicked.
    pub failed: Vec<String>,
    /// Triggers detected by [`RuleEngine::process`].
    pub triggers: BTreeSet<String>,
    /// Rule sets loaded on demand by [`RuleEngine::process`].
    pub loaded: Vec<String>,
}

enum RuleRun {
    Committed(RuleTarget),
    Unchanged,
    Failed(CortexError),
}

/// Owns the rule registry, the prioritizer and the feedback logs.
pub struct RuleEngine {
    store: Arc<dyn DurableStore>,
    registry: RwLock<RuleRegistry>,
    prioritizer: Mutex<RulePrioritizer>,
    /// Orders persistence of effectiveness history.
    history_lock: tokio::sync::Mutex<()>,
    classifier: Arc<dyn TriggerClassifier>,
    feedback: FeedbackLog,
    metrics: MetricsLog,
    rule_timeout: Duration,
}

impl RuleEngine {
    pub fn new(store: Arc<dyn DurableStore>, catalog: RuleSetCatalog, config: &CortexConfig) -> Self {
        Self {
            registry: RwLock::new(RuleRegistry::new(
                catalog,
                config.rules.always_active.iter().cloned(),
            )),
            prioritizer: Mutex::new(RulePrioritizer::new(&config.rules)),
            history_lock: tokio::sync::Mutex::new(()),
            classifier: Arc::new(KeywordTriggerClassifier::new()),
            feedback: FeedbackLog::new(store.clone(), config.storage.feedback_cap),
            metrics: MetricsLog::new(store.clone(), config.storage.metrics_cap),
            rule_timeout: Duration::from_millis(config.rules.rule_timeout_ms),
            store,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TriggerClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    fn prioritizer(&self) -> MutexGuard<'_, RulePrioritizer> {
        self.prioritizer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Loads effectiveness history and activates the always-active rule sets.
    ///
    /// Unreadable history is logged and replaced by an empty one. An
    /// always-active set missing from the catalog is an error.
    pub async fn initialize(&self) -> Result<(), CortexError> {
        match RulePrioritizer::load(self.store.as_ref()).await {
            Ok(record) => self.prioritizer().restore(record),
            Err(e) => warn!(error = %e, "failed to load rule history, starting fresh"),
        }

        let history = self.prioritizer().snapshot();
        let mut registry = self.registry.write().await;
        let always_active: Vec<String> = registry.always_active().iter().cloned().collect();
        for name in always_active {
            registry.load_rule_set(&name, |id| adjustment_of(&history, id))?;
        }
        info!(
            rule_sets = registry.rule_sets().len(),
            active_rules = registry.len(),
            "rule engine initialized"
        );
        Ok(())
    }

    /// Triggers for a request: the classifier's verdict on its content plus
    /// any listed in its `triggers` attribute.
    pub fn detect_triggers(&self, request: &Request) -> BTreeSet<String> {
        let mut triggers = self.classifier.classify(&request.content);
        if let Some(explicit) = request
            .attributes
            .get(TRIGGERS_ATTRIBUTE)
            .and_then(|v| v.as_array())
        {
            triggers.extend(explicit.iter().filter_map(|t| t.as_str()).map(String::from));
        }
        triggers
    }

    /// Loads every rule set whose triggers intersect `triggers`. Returns the
    /// names of the sets newly loaded; a repeated call loads nothing.
    pub async fn load_on_demand_rules(&self, triggers: &BTreeSet<String>) -> Vec<String> {
        if triggers.is_empty() {
            return Vec::new();
        }
        let history = self.prioritizer().snapshot();
        self.registry
            .write()
            .await
            .load_on_demand_rules(triggers, |id| adjustment_of(&history, id))
    }

    /// Loads one rule set by name, whatever its triggers.
    pub async fn load_rule_set(&self, name: &str) -> Result<usize, CortexError> {
        let history = self.prioritizer().snapshot();
        self.registry
            .write()
            .await
            .load_rule_set(name, |id| adjustment_of(&history, id))
    }

    /// Removes a rule set's rules. Always-active sets are refused.
    pub async fn unload_rule(&self, name: &str) -> bool {
        self.registry.write().await.unload_rule(name)
    }

    /// Active rules in execution order.
    pub async fn get_active_rules(&self) -> Vec<ActiveRule> {
        let rules = self.registry.read().await.active_rules();
        self.prioritizer().get_prioritized_rules(rules)
    }

    pub async fn rule_sets(&self) -> Vec<RuleSetInfo> {
        self.registry.read().await.rule_sets()
    }

    async fn run_rule(&self, rule: &ActiveRule, target: RuleTarget) -> RuleRun {
        let task = {
            let rule = rule.rule.clone();
            tokio::spawn(async move {
                let mut candidate = target;
                let result = rule.execute(&mut candidate).await;
                (result, candidate)
            })
        };
        let abort = task.abort_handle();

        let failure = |message: String| {
            RuleRun::Failed(CortexError::RuleExecution {
                rule_id: rule.id.clone(),
                message,
            })
        };

        match tokio::time::timeout(self.rule_timeout, task).await {
            Err(_) => {
                abort.abort();
                RuleRun::Failed(CortexError::Timeout {
                    duration: self.rule_timeout,
                })
            }
            Ok(Err(join)) if join.is_panic() => failure("rule panicked".to_string()),
            Ok(Err(join)) => failure(join.to_string()),
            Ok(Ok((Err(e), _))) => failure(e.to_string()),
            Ok(Ok((Ok(result), candidate))) => {
                if !result.success {
                    failure(
                        result
                            .message
                            .unwrap_or_else(|| "rule reported failure".to_string()),
                    )
                } else if result.modified {
                    RuleRun::Committed(candidate)
                } else {
                    RuleRun::Unchanged
                }
            }
        }
    }

    /// Runs the active rules, in priority order, over a working copy of
    /// `request` and `context`.
    ///
    /// Never fails: a failing rule is logged with its id and skipped, and
    /// does not affect the `modified` flag.
    pub async fn apply_rules(&self, request: &Request, context: &Context) -> RuleOutcome {
        let started = Instant::now();
        let rules = self.get_active_rules().await;
        let mut working = RuleTarget::new(request.clone(), context.clone());
        let mut modified = false;
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        for rule in &rules {
            match self.run_rule(rule, working.clone()).await {
                RuleRun::Committed(candidate) => {
                    debug!(rule_id = %rule.id, priority = rule.priority, "rule modified request");
                    working = candidate;
                    modified = true;
                    applied.push(rule.id.clone());
                }
                RuleRun::Unchanged => {
                    debug!(rule_id = %rule.id, "rule left request unchanged");
                    applied.push(rule.id.clone());
                }
                RuleRun::Failed(e) => {
                    warn!(rule_id = %rule.id, error = %e, "rule failed, skipping");
                    failed.push(rule.id.clone());
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        metrics::counter!("cortex_rules_applied_total").increment(applied.len() as u64);
        metrics::counter!("cortex_rule_failures_total").increment(failed.len() as u64);
        let sample = json!({
            "rules": rules.len(),
            "applied": applied.len(),
            "failed": failed.len(),
            "modified": modified,
            "elapsedMs": elapsed_ms,
        });
        if let Err(e) = self.metrics.record(RULE_APPLICATION_METRIC, sample).await {
            warn!(error = %e, "failed to record rule application metrics");
        }

        RuleOutcome {
            request: working.request,
            context: working.context,
            modified,
            applied,
            failed,
            triggers: BTreeSet::new(),
            loaded: Vec::new(),
        }
    }

    /// Detects triggers, loads matching rule sets and applies all active
    /// rules.
    pub async fn process(&self, request: &Request, context: &Context) -> RuleOutcome {
        let triggers = self.detect_triggers(request);
        let loaded = self.load_on_demand_rules(&triggers).await;
        if !loaded.is_empty() {
            debug!(?triggers, ?loaded, "rule sets loaded on demand");
        }
        let mut outcome = self.apply_rules(request, context).await;
        outcome.triggers = triggers;
        outcome.loaded = loaded;
        outcome
    }

    /// Folds an observed score into a rule's effectiveness, moves its live
    /// priority when the adjustment changes, and persists the history.
    ///
    /// A failed history write is logged; the in-memory update stands.
    pub async fn record_rule_effectiveness(
        &self,
        rule_id: &str,
        observed: f64,
    ) -> Result<EffectivenessUpdate, CortexError> {
        let _history = self.history_lock.lock().await;
        let (update, snapshot) = {
            let mut prioritizer = self.prioritizer();
            let update = prioritizer.record_rule_effectiveness(rule_id, observed)?;
            (update, prioritizer.snapshot())
        };

        if update.priority_delta != 0 {
            self.registry
                .write()
                .await
                .apply_priority_delta(rule_id, update.priority_delta);
        }
        if let Err(e) = RulePrioritizer::persist(self.store.as_ref(), &snapshot).await {
            warn!(rule_id, error = %e, "failed to persist rule history");
        }
        Ok(update)
    }

    /// Appends feedback to the capped log and, when it names a rule, feeds
    /// its score into that rule's effectiveness.
    pub async fn record_feedback(
        &self,
        entry: &FeedbackEntry,
    ) -> Result<Option<EffectivenessUpdate>, CortexError> {
        if let Err(e) = self.feedback.record(entry).await {
            warn!(error = %e, "failed to append feedback");
        }
        match &entry.rule_id {
            Some(rule_id) => self
                .record_rule_effectiveness(rule_id, entry.score)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    pub async fn feedback_entries(&self) -> Result<Vec<FeedbackEntry>, CortexError> {
        self.feedback.entries().await
    }

    pub async fn metric_samples(&self, category: &str) -> Result<Vec<MetricSample>, CortexError> {
        self.metrics.samples(category).await
    }

    /// Current effectiveness scores and adjustments.
    pub fn effectiveness(&self) -> EffectivenessRecord {
        self.prioritizer().snapshot()
    }
}

fn adjustment_of(history: &EffectivenessRecord, rule_id: &str) -> i32 {
    history.adjustments.get(rule_id).copied().unwrap_or(0)
}
