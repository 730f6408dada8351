// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule registry, adaptive prioritization and rule engine for Cortex.
//!
//! Rules are grouped into named rule sets resolved from a
//! [`RuleSetCatalog`]. The [`RuleEngine`] derives triggers from a request,
//! loads matching sets on demand, orders the active rules by priority and
//! effectiveness, and applies them with per-rule fault isolation.

pub mod builtin;
pub mod classifier;
pub mod engine;
pub mod feedback;
pub mod prioritization;
pub mod registry;
pub mod rule;
pub mod ruleset;

pub use classifier::KeywordTriggerClassifier;
pub use engine::{RuleEngine, RuleOutcome};
pub use feedback::{FeedbackEntry, FeedbackLog, MetricSample, MetricsLog};
pub use prioritization::{EffectivenessRecord, EffectivenessUpdate, RulePrioritizer};
pub use registry::{RuleRegistry, RuleSetInfo, RuleSetState};
pub use rule::{ActiveRule, Rule, RuleKind, RuleResult, RuleTarget, rule_id};
pub use ruleset::{FnRuleSetFactory, RuleSet, RuleSetCatalog, RuleSetFactory};
