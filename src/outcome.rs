//! Cache-outcome classification for targets and project contexts
//!
//! A target's outcome is either `Cached` (skipped because a prior result was
//! reused) or `Executed` (actually ran). Skip and finish events for the same
//! target may arrive in either order, so outcomes are combined with a fixed
//! priority instead of last-write-wins:
//!
//! ```text
//! existing   incoming   result
//! --------   --------   --------
//! (none)     Executed   Executed
//! (none)     Cached     Cached
//! Executed   Cached     Cached
//! Cached     Executed   Cached
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How a target's result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
    Executed,
    Cached,
}

impl TargetOutcome {
    /// Combine a newly observed outcome with the recorded one
    ///
    /// Cached always wins; Executed only fills an empty slot.
    pub fn merge(existing: Option<TargetOutcome>, incoming: TargetOutcome) -> TargetOutcome {
        match (existing, incoming) {
            (_, TargetOutcome::Cached) => TargetOutcome::Cached,
            (Some(recorded), TargetOutcome::Executed) => recorded,
            (None, TargetOutcome::Executed) => TargetOutcome::Executed,
        }
    }
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOutcome::Executed => write!(f, "executed"),
            TargetOutcome::Cached => write!(f, "cached"),
        }
    }
}

/// Per-target outcomes recorded for one project context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutcomeMap {
    outcomes: BTreeMap<String, TargetOutcome>,
}

impl OutcomeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation using [`TargetOutcome::merge`]
    pub fn record(&mut self, target_name: &str, incoming: TargetOutcome) {
        let merged = TargetOutcome::merge(self.get(target_name), incoming);
        self.outcomes.insert(target_name.to_string(), merged);
    }

    pub fn get(&self, target_name: &str) -> Option<TargetOutcome> {
        self.outcomes.get(target_name).copied()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TargetOutcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), *outcome))
    }

    /// True iff any of `target_names` was actually executed
    pub fn executed_any<S: AsRef<str>>(&self, target_names: &[S]) -> bool {
        target_names
            .iter()
            .any(|name| self.get(name.as_ref()) == Some(TargetOutcome::Executed))
    }
}

/// True iff every declared target was satisfied from cache
///
/// Targets that ran but were not declared play no role. An empty declared
/// list is vacuously cached.
pub fn is_cached_execution<S: AsRef<str>>(declared: &[S], outcomes: &OutcomeMap) -> bool {
    declared
        .iter()
        .all(|name| outcomes.get(name.as_ref()) == Some(TargetOutcome::Cached))
}
