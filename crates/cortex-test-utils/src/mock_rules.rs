// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rules with scripted behavior for exercising the engine's pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cortex_core::CortexError;
use cortex_rules::{Rule, RuleResult, RuleTarget};
use serde_json::Value;

/// Request attribute that [`Script::Trace`] rules append their name to.
pub const TRACE_ATTRIBUTE: &str = "trace";

/// What a [`ScriptedRule`] does when executed.
#[derive(Debug, Clone)]
pub enum Script {
    /// Append the rule's name to the `trace` attribute.
    Trace,
    /// Set one request attribute.
    SetAttribute { key: String, value: Value },
    /// Report success without touching the target.
    Unchanged,
    /// Modify the target, then report `success = false`.
    ReportFailure,
    /// Modify the target, then return an error.
    Error,
    /// Modify the target, then panic.
    Panic,
    /// Sleep, then modify the target.
    Sleep(Duration),
}

/// A rule that follows a [`Script`] and counts its invocations.
#[derive(Debug, Clone)]
pub struct ScriptedRule {
    name: String,
    priority: i32,
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedRule {
    pub fn new(name: impl Into<String>, priority: i32, script: Script) -> Self {
        Self {
            name: name.into(),
            priority,
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn tracing(name: impl Into<String>, priority: i32) -> Self {
        Self::new(name, priority, Script::Trace)
    }

    pub fn setting(name: impl Into<String>, priority: i32, key: &str, value: Value) -> Self {
        Self::new(
            name,
            priority,
            Script::SetAttribute {
                key: key.to_string(),
                value,
            },
        )
    }

    pub fn failing(name: impl Into<String>, priority: i32) -> Self {
        Self::new(name, priority, Script::Error)
    }

    pub fn panicking(name: impl Into<String>, priority: i32) -> Self {
        Self::new(name, priority, Script::Panic)
    }

    pub fn slow(name: impl Into<String>, priority: i32, delay: Duration) -> Self {
        Self::new(name, priority, Script::Sleep(delay))
    }

    /// Number of times the rule has been executed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn scribble(&self, target: &mut RuleTarget) {
        target
            .request
            .attributes
            .insert(format!("touched_by_{}", self.name), Value::Bool(true));
    }
}

#[async_trait]
impl Rule for ScriptedRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn execute(&self, target: &mut RuleTarget) -> Result<RuleResult, CortexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Trace => {
                let trace = target
                    .request
                    .attributes
                    .entry(TRACE_ATTRIBUTE.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(names) = trace {
                    names.push(Value::String(self.name.clone()));
                }
                Ok(RuleResult::modified("traced"))
            }
            Script::SetAttribute { key, value } => {
                target.request.attributes.insert(key.clone(), value.clone());
                Ok(RuleResult::modified(format!("set {key}")))
            }
            Script::Unchanged => Ok(RuleResult::unchanged()),
            Script::ReportFailure => {
                self.scribble(target);
                Ok(RuleResult::failed("scripted failure"))
            }
            Script::Error => {
                self.scribble(target);
                Err(CortexError::Internal(format!("{} exploded", self.name)))
            }
            Script::Panic => {
                self.scribble(target);
                panic!("{} panicked", self.name);
            }
            Script::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                self.scribble(target);
                Ok(RuleResult::modified("woke up"))
            }
        }
    }
}
