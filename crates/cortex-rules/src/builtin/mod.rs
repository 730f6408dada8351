// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in rule sets.
//!
//! `core` and `enhancement` are always active; `code_quality`, `debugging`
//! and `documentation` load when their triggers are detected.

mod baseline;
mod guidance;

use std::sync::Arc;

use serde_json::Value;

use crate::rule::RuleKind;
use crate::ruleset::{FnRuleSetFactory, RuleSet, RuleSetCatalog};

pub use baseline::{PreferenceInjection, SessionSummary, WhitespaceNormalization};
pub use guidance::{Guidelines, RecentFailures};

/// Request attribute collecting guideline strings attached by rules.
pub const GUIDELINES_ATTRIBUTE: &str = "guidelines";

/// Appends `items` to the string array attribute `key`, skipping entries
/// already present. Returns true if anything was added.
pub fn append_to_list(
    attributes: &mut std::collections::BTreeMap<String, Value>,
    key: &str,
    items: impl IntoIterator<Item = String>,
) -> bool {
    let slot = attributes
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    let Value::Array(list) = slot else {
        return false;
    };

    let mut added = false;
    for item in items {
        let item = Value::String(item);
        if !list.contains(&item) {
            list.push(item);
            added = true;
        }
    }
    added
}

pub fn core_set() -> RuleSet {
    RuleSet::new("core", RuleKind::Core)
        .with_rule(Arc::new(PreferenceInjection))
        .with_rule(Arc::new(SessionSummary))
}

pub fn enhancement_set() -> RuleSet {
    RuleSet::new("enhancement", RuleKind::Enhancement)
        .with_rule(Arc::new(WhitespaceNormalization))
}

pub fn code_quality_set() -> RuleSet {
    RuleSet::new("code_quality", RuleKind::OnDemand)
        .with_triggers(["code_implementation", "code_review"])
        .with_rule(Arc::new(Guidelines::coding()))
}

pub fn debugging_set() -> RuleSet {
    RuleSet::new("debugging", RuleKind::OnDemand)
        .with_triggers(["error_handling", "debugging"])
        .with_rule(Arc::new(Guidelines::troubleshooting()))
        .with_rule(Arc::new(RecentFailures::default()))
}

pub fn documentation_set() -> RuleSet {
    RuleSet::new("documentation", RuleKind::OnDemand)
        .with_triggers(["documentation"])
        .with_rule(Arc::new(Guidelines::documentation()))
}

/// Catalog holding every built-in rule set.
pub fn catalog() -> RuleSetCatalog {
    RuleSetCatalog::new()
        .with(Arc::new(FnRuleSetFactory::new(core_set)))
        .with(Arc::new(FnRuleSetFactory::new(enhancement_set)))
        .with(Arc::new(FnRuleSetFactory::new(code_quality_set)))
        .with(Arc::new(FnRuleSetFactory::new(debugging_set)))
        .with(Arc::new(FnRuleSetFactory::new(documentation_set)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn catalog_lists_builtin_sets() {
        assert_eq!(
            catalog().names(),
            ["code_quality", "core", "debugging", "documentation", "enhancement"]
        );
    }

    #[test]
    fn code_implementation_matches_only_code_quality() {
        let triggers = ["code_implementation".to_string()].into();
        assert_eq!(catalog().matching(&triggers), ["code_quality"]);
    }

    #[test]
    fn append_dedups() {
        let mut attributes = BTreeMap::new();
        assert!(append_to_list(&mut attributes, "k", ["a".to_string(), "b".to_string()]));
        assert!(!append_to_list(&mut attributes, "k", ["a".to_string()]));
        assert_eq!(attributes["k"], json!(["a", "b"]));
    }

    #[test]
    fn append_replaces_non_array_value() {
        let mut attributes = BTreeMap::from([("k".to_string(), json!("scalar"))]);
        assert!(append_to_list(&mut attributes, "k", ["a".to_string()]));
        assert_eq!(attributes["k"], json!(["a"]));
    }
}
