// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registry of active rules.
//!
//! Each rule set moves through `unloaded -> loading -> active -> unloaded`.
//! Loading and unloading are all-or-nothing for a set's rule ids, which are
//! matched by their `<rule_set>:` prefix.

use std::collections::{BTreeSet, HashMap, HashSet};

use cortex_core::CortexError;
use semver::Version;
use serde::Serialize;
use strum::Display;
use tracing::{debug, info, warn};

use crate::rule::{ActiveRule, RULE_ID_SEPARATOR, rule_id};
use crate::ruleset::RuleSetCatalog;

/// Lifecycle state of a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleSetState {
    Unloaded,
    Loading,
    Active,
}

/// Catalog entry plus its current state, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSetInfo {
    pub name: String,
    /// Known only once the set has been loaded.
    pub version: Option<String>,
    pub kind: String,
    pub triggers: Vec<String>,
    pub state: RuleSetState,
    pub always_active: bool,
}

/// Active rules, grouped by rule set.
pub struct RuleRegistry {
    catalog: RuleSetCatalog,
    rules: Vec<ActiveRule>,
    states: HashMap<String, RuleSetState>,
    versions: HashMap<String, Version>,
    always_active: BTreeSet<String>,
}

impl RuleRegistry {
    pub fn new<I, S>(catalog: RuleSetCatalog, always_active: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog,
            rules: Vec::new(),
            states: HashMap::new(),
            versions: HashMap::new(),
            always_active: always_active.into_iter().map(Into::into).collect(),
        }
    }

    pub fn catalog(&self) -> &RuleSetCatalog {
        &self.catalog
    }

    /// Names of the sets loaded at startup and never unloaded.
    pub fn always_active(&self) -> &BTreeSet<String> {
        &self.always_active
    }

    pub fn state(&self, rule_set: &str) -> RuleSetState {
        self.states
            .get(rule_set)
            .copied()
            .unwrap_or(RuleSetState::Unloaded)
    }

    fn prefix(rule_set: &str) -> String {
        format!("{rule_set}{RULE_ID_SEPARATOR}")
    }

    /// Whether any rule of `rule_set` is in the active set.
    pub fn is_loaded(&self, rule_set: &str) -> bool {
        let prefix = Self::prefix(rule_set);
        self.state(rule_set) == RuleSetState::Active
            || self.rules.iter().any(|r| r.id.starts_with(&prefix))
    }

    /// Builds and activates `rule_set`. Returns the number of rules added,
    /// zero when the set was already loaded.
    ///
    /// `adjustment` supplies each rule's persisted priority adjustment so
    /// that effectiveness history survives a reload.
    pub fn load_rule_set(
        &mut self,
        rule_set: &str,
        adjustment: impl Fn(&str) -> i32,
    ) -> Result<usize, CortexError> {
        if self.is_loaded(rule_set) {
            debug!(rule_set, "rule set already active");
            return Ok(0);
        }
        let factory = self
            .catalog
            .get(rule_set)
            .ok_or_else(|| CortexError::RuleSetNotFound {
                name: rule_set.to_string(),
            })?;

        self.states
            .insert(rule_set.to_string(), RuleSetState::Loading);
        let set = match factory.build() {
            Ok(set) => set,
            Err(e) => {
                self.states
                    .insert(rule_set.to_string(), RuleSetState::Unloaded);
                return Err(e);
            }
        };

        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(set.rules.len());
        for rule in &set.rules {
            let id = rule_id(&set.name, rule.name());
            if !seen.insert(id.clone()) {
                self.states
                    .insert(rule_set.to_string(), RuleSetState::Unloaded);
                return Err(CortexError::Internal(format!(
                    "rule set `{rule_set}` defines rule `{}` twice",
                    rule.name()
                )));
            }
            staged.push(ActiveRule {
                priority: rule.priority() + adjustment(&id),
                id,
                rule_set: set.name.clone(),
                kind: set.kind,
                triggers: set.triggers.clone(),
                rule: rule.clone(),
            });
        }

        let added = staged.len();
        self.rules.extend(staged);
        self.versions
            .insert(rule_set.to_string(), set.version.clone());
        self.states
            .insert(rule_set.to_string(), RuleSetState::Active);
        info!(rule_set, version = %set.version, rules = added, "rule set loaded");
        Ok(added)
    }

    /// Loads every known rule set whose triggers intersect `triggers`.
    ///
    /// Sets that are already active are skipped; a set that fails to build
    /// is logged and skipped. Returns the names of the sets newly loaded.
    pub fn load_on_demand_rules(
        &mut self,
        triggers: &BTreeSet<String>,
        adjustment: impl Fn(&str) -> i32,
    ) -> Vec<String> {
        let mut loaded = Vec::new();
        for name in self.catalog.matching(triggers) {
            if self.is_loaded(&name) {
                continue;
            }
            match self.load_rule_set(&name, &adjustment) {
                Ok(_) => loaded.push(name),
                Err(e) => warn!(rule_set = %name, error = %e, "failed to load rule set"),
            }
        }
        loaded
    }

    /// Removes every active rule of `rule_set`.
    ///
    /// Always-active sets are refused. Returns true if the set was active.
    pub fn unload_rule(&mut self, rule_set: &str) -> bool {
        if self.always_active.contains(rule_set) {
            warn!(rule_set, "refusing to unload an always-active rule set");
            return false;
        }
        let prefix = Self::prefix(rule_set);
        let before = self.rules.len();
        self.rules.retain(|r| !r.id.starts_with(&prefix));
        let removed = before - self.rules.len();
        let was_active = self.states.remove(rule_set) == Some(RuleSetState::Active);
        self.versions.remove(rule_set);

        if removed > 0 || was_active {
            info!(rule_set, rules = removed, "rule set unloaded");
        }
        removed > 0 || was_active
    }

    /// Snapshot of the active rules, in load order.
    pub fn active_rules(&self) -> Vec<ActiveRule> {
        self.rules.clone()
    }

    pub fn get(&self, rule_id: &str) -> Option<&ActiveRule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// Shifts the live priority of an active rule.
    pub fn apply_priority_delta(&mut self, rule_id: &str, delta: i32) -> bool {
        match self.rules.iter_mut().find(|r| r.id == rule_id) {
            Some(rule) => {
                rule.priority += delta;
                debug!(rule_id, delta, priority = rule.priority, "rule priority adjusted");
                true
            }
            None => false,
        }
    }

    /// Every catalog entry with its current state.
    pub fn rule_sets(&self) -> Vec<RuleSetInfo> {
        self.catalog
            .names()
            .into_iter()
            .filter_map(|name| self.catalog.get(name))
            .map(|factory| {
                let name = factory.name().to_string();
                RuleSetInfo {
                    version: self.versions.get(&name).map(Version::to_string),
                    kind: factory.kind().to_string(),
                    triggers: factory.triggers().to_vec(),
                    state: self.state(&name),
                    always_active: self.always_active.contains(&name),
                    name,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
