// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive rule prioritization.
//!
//! Every rule carries an effectiveness score (an exponential moving average
//! of observed usefulness, 1.0 when unseen) and a bounded cumulative priority
//! adjustment. Both are persisted under their own durable keys so that the
//! history survives rule set reloads.

use std::collections::BTreeMap;

use cortex_config::model::RulesConfig;
use cortex_core::{CortexError, DurableStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rule::ActiveRule;

/// Durable key holding `rule_id -> score`.
pub const EFFECTIVENESS_KEY: &str = "rule_effectiveness";

/// Durable key holding `rule_id -> cumulative adjustment`.
pub const ADJUSTMENTS_KEY: &str = "rule_priority_adjustments";

/// Persisted effectiveness history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessRecord {
    pub scores: BTreeMap<String, f64>,
    pub adjustments: BTreeMap<String, i32>,
}

/// What one call to [`RulePrioritizer::record_rule_effectiveness`] changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivenessUpdate {
    pub rule_id: String,
    pub old_score: f64,
    pub new_score: f64,
    /// Change to apply to the rule's live priority.
    pub priority_delta: i32,
}

/// Scores rules and orders them for execution.
#[derive(Debug, Clone)]
pub struct RulePrioritizer {
    record: EffectivenessRecord,
    config: RulesConfig,
}

impl RulePrioritizer {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            record: EffectivenessRecord::default(),
            config: config.clone(),
        }
    }

    pub fn with_record(mut self, record: EffectivenessRecord) -> Self {
        self.restore(record);
        self
    }

    /// Replaces the history, e.g. with one loaded from the durable store.
    pub fn restore(&mut self, record: EffectivenessRecord) {
        self.record = record;
    }

    /// Effectiveness score of a rule, or the default for an unseen rule.
    pub fn score(&self, rule_id: &str) -> f64 {
        self.record
            .scores
            .get(rule_id)
            .copied()
            .unwrap_or(self.config.default_score)
    }

    /// Cumulative priority adjustment of a rule.
    pub fn adjustment(&self, rule_id: &str) -> i32 {
        self.record.adjustments.get(rule_id).copied().unwrap_or(0)
    }

    /// Orders rules by priority, highest first, breaking ties by score.
    /// The sort is stable, so fully tied rules keep their input order.
    pub fn get_prioritized_rules(&self, mut rules: Vec<ActiveRule>) -> Vec<ActiveRule> {
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| self.score(&b.id).total_cmp(&self.score(&a.id)))
        });
        rules
    }

    /// Folds an observation into the rule's moving average and, when the
    /// score moved far enough, adjusts its priority.
    pub fn record_rule_effectiveness(
        &mut self,
        rule_id: &str,
        observed: f64,
    ) -> Result<EffectivenessUpdate, CortexError> {
        if !observed.is_finite() {
            return Err(CortexError::Internal(format!(
                "effectiveness score for {rule_id} must be finite, got {observed}"
            )));
        }
        let old_score = self.score(rule_id);
        let alpha = self.config.ema_alpha;
        let new_score = (1.0 - alpha) * old_score + alpha * observed;
        self.record.scores.insert(rule_id.to_string(), new_score);

        let priority_delta = if (new_score - old_score).abs() > self.config.adjustment_threshold {
            self.adjust_rule_priority(rule_id, new_score)
        } else {
            0
        };

        debug!(rule_id, old_score, new_score, priority_delta, "rule effectiveness recorded");
        Ok(EffectivenessUpdate {
            rule_id: rule_id.to_string(),
            old_score,
            new_score,
            priority_delta,
        })
    }

    /// Proposes +1 for a strong score and -1 for a weak one, clamps the
    /// cumulative adjustment, and returns the change actually made.
    pub fn adjust_rule_priority(&mut self, rule_id: &str, new_score: f64) -> i32 {
        let proposal = if new_score > self.config.promote_score {
            1
        } else if new_score < self.config.demote_score {
            -1
        } else {
            0
        };
        let bound = self.config.max_adjustment;
        let previous = self.adjustment(rule_id);
        let next = (previous + proposal).clamp(-bound, bound);
        self.record.adjustments.insert(rule_id.to_string(), next);
        next - previous
    }

    pub fn snapshot(&self) -> EffectivenessRecord {
        self.record.clone()
    }

    /// Reads the persisted history. Missing keys are an empty history; an
    /// unreadable value is logged and treated as empty.
    pub async fn load(store: &dyn DurableStore) -> Result<EffectivenessRecord, CortexError> {
        Ok(EffectivenessRecord {
            scores: read_map(store, EFFECTIVENESS_KEY).await?,
            adjustments: read_map(store, ADJUSTMENTS_KEY).await?,
        })
    }

    /// Writes both history keys.
    pub async fn persist(
        store: &dyn DurableStore,
        record: &EffectivenessRecord,
    ) -> Result<(), CortexError> {
        store
            .put(EFFECTIVENESS_KEY, &serde_json::to_string(&record.scores)?)
            .await?;
        store
            .put(ADJUSTMENTS_KEY, &serde_json::to_string(&record.adjustments)?)
            .await
    }
}

async fn read_map<V>(store: &dyn DurableStore, key: &str) -> Result<BTreeMap<String, V>, CortexError>
where
    V: for<'de> Deserialize<'de>,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(BTreeMap::new());
    };
    match serde_json::from_str(&raw) {
        Ok(map) => Ok(map),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable rule history");
            Ok(BTreeMap::new())
        }
    }
}
