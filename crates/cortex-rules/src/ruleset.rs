// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule sets and the catalog they are resolved from.
//!
//! Rule sets are data: the [`RuleSetCatalog`] maps a name to a
//! [`RuleSetFactory`] and the registry asks the factory to build the set when
//! it is loaded. Nothing is resolved dynamically.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use cortex_core::CortexError;
use semver::Version;

use crate::rule::{Rule, RuleKind};

/// A named, versioned bundle of rules sharing an activation trigger list.
#[derive(Clone)]
pub struct RuleSet {
    pub name: String,
    pub version: Version,
    pub kind: RuleKind,
    pub triggers: Vec<String>,
    pub rules: Vec<Arc<dyn Rule>>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            version: Version::new(1, 0, 0),
            kind,
            triggers: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = triggers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("version", &self.version.to_string())
            .field("kind", &self.kind)
            .field("triggers", &self.triggers)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a rule set on demand.
///
/// `triggers` must be answerable without building the set, since the
/// registry consults it to decide which sets to load.
pub trait RuleSetFactory: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> RuleKind;

    fn triggers(&self) -> &[String];

    fn build(&self) -> Result<RuleSet, CortexError>;
}

/// A factory defined by a build closure.
pub struct FnRuleSetFactory {
    name: String,
    kind: RuleKind,
    triggers: Vec<String>,
    build: Box<dyn Fn() -> RuleSet + Send + Sync>,
}

impl FnRuleSetFactory {
    /// Wraps a closure; name, kind and triggers are taken from one build.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> RuleSet + Send + Sync + 'static,
    {
        let sample = build();
        Self {
            name: sample.name,
            kind: sample.kind,
            triggers: sample.triggers,
            build: Box::new(build),
        }
    }
}

impl RuleSetFactory for FnRuleSetFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> RuleKind {
        self.kind
    }

    fn triggers(&self) -> &[String] {
        &self.triggers
    }

    fn build(&self) -> Result<RuleSet, CortexError> {
        let set = (self.build)();
        if set.name != self.name {
            return Err(CortexError::Internal(format!(
                "rule set factory `{}` built a set named `{}`",
                self.name, set.name
            )));
        }
        Ok(set)
    }
}

/// Registry of known rule sets, keyed by name.
#[derive(Default, Clone)]
pub struct RuleSetCatalog {
    factories: BTreeMap<String, Arc<dyn RuleSetFactory>>,
}

impl RuleSetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its name, replacing any previous one.
    pub fn register(&mut self, factory: Arc<dyn RuleSetFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, factory: Arc<dyn RuleSetFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleSetFactory>> {
        self.factories.get(name).cloned()
    }

    /// Names of all known rule sets, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Names of the rule sets whose triggers intersect `triggers`, sorted.
    pub fn matching(&self, triggers: &BTreeSet<String>) -> Vec<String> {
        self.factories
            .values()
            .filter(|f| f.triggers().iter().any(|t| triggers.contains(t)))
            .map(|f| f.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for RuleSetCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSetCatalog")
            .field("rule_sets", &self.names())
            .finish()
    }
}
