// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable classifiers: trigger detection, interaction summaries, and
//! importance marking. The core consumes their output and never inspects
//! how it was produced.

use std::collections::BTreeSet;

use crate::types::{Request, Response};

/// Derives trigger keywords from a request's textual content.
pub trait TriggerClassifier: Send + Sync {
    /// Returns the set of triggers present in `text`. An empty set is a
    /// normal outcome and simply loads no rule sets.
    fn classify(&self, text: &str) -> BTreeSet<String>;
}

/// Produces the one-line summary stored with each interaction.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, request: &Request, response: &Response) -> String;
}

/// Decides whether an exchange carries failure or urgency markers.
pub trait ImportancePredicate: Send + Sync {
    fn has_markers(&self, request: &Request, response: &Response) -> bool;
}
