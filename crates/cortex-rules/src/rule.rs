// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rule contract.
//!
//! A [`Rule`] is a content transform over a [`RuleTarget`]. It decides for
//! itself whether it applies and reports the outcome in a [`RuleResult`];
//! a rule that does not apply returns [`RuleResult::unchanged`].

use std::sync::Arc;

use async_trait::async_trait;
use cortex_core::{Context, CortexError, Request};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Separator between a rule set name and a rule name in a rule id.
pub const RULE_ID_SEPARATOR: char = ':';

/// Builds the namespaced id `<rule_set>:<rule>`.
pub fn rule_id(rule_set: &str, rule: &str) -> String {
    format!("{rule_set}{RULE_ID_SEPARATOR}{rule}")
}

/// Category of a rule, which also decides how its rule set is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Loaded at startup and never unloaded.
    Core,
    /// Loaded at startup and never unloaded.
    Enhancement,
    /// Loaded when a trigger matches.
    OnDemand,
    /// Loaded explicitly by name.
    Special,
}

/// Outcome of running one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    /// False means the rule failed and its changes are discarded.
    pub success: bool,
    /// True when the rule changed the target.
    pub modified: bool,
    pub message: Option<String>,
}

impl RuleResult {
    /// The rule ran and left the target alone.
    pub fn unchanged() -> Self {
        Self {
            success: true,
            modified: false,
            message: None,
        }
    }

    /// The rule ran and changed the target.
    pub fn modified(message: impl Into<String>) -> Self {
        Self {
            success: true,
            modified: true,
            message: Some(message.into()),
        }
    }

    /// The rule could not do its work.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            modified: false,
            message: Some(message.into()),
        }
    }
}

/// The working copy a rule reads and mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTarget {
    pub request: Request,
    pub context: Context,
}

impl RuleTarget {
    pub fn new(request: Request, context: Context) -> Self {
        Self { request, context }
    }
}

/// A content transform applied to a request and its session context.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Name unique within the rule's set.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Base priority; higher runs first.
    fn priority(&self) -> i32;

    /// Checks whether the rule applies and, if so, applies it.
    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError>;
}

/// A rule currently loaded into the registry.
#[derive(Clone)]
pub struct ActiveRule {
    /// Namespaced id, `<rule_set>:<rule>`.
    pub id: String,
    pub rule_set: String,
    pub kind: RuleKind,
    /// Live priority: base priority plus the rule's cumulative adjustment.
    pub priority: i32,
    /// Triggers of the owning rule set.
    pub triggers: Vec<String>,
    pub rule: Arc<dyn Rule>,
}

impl std::fmt::Debug for ActiveRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRule")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("triggers", &self.triggers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_are_namespaced() {
        assert_eq!(rule_id("debugging", "checklist"), "debugging:checklist");
    }

    #[test]
    fn kinds_use_kebab_case() {
        assert_eq!(RuleKind::OnDemand.to_string(), "on-demand");
        assert_eq!("special".parse::<RuleKind>().unwrap(), RuleKind::Special);
        assert_eq!(serde_json::to_string(&RuleKind::OnDemand).unwrap(), "\"on-demand\"");
    }

    #[test]
    fn result_constructors() {
        assert!(RuleResult::unchanged().success);
        assert!(!RuleResult::unchanged().modified);
        assert!(RuleResult::modified("x").modified);
        assert!(!RuleResult::failed("x").success);
    }
}
