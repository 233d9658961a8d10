//! Consistency violations found while reconstructing a build
//!
//! Violations never stop the analysis: the offending event or link is
//! dropped and processing continues on a best-effort basis.

use crate::event::{ContextId, EvaluationId, InstanceId, NodeId};
use serde::Serialize;
use thiserror::Error;

/// A single invariant breach
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("Cannot get project instance id: eval id {evaluation_id:?} instance id {instance_id:?}")]
    MissingIdentity {
        evaluation_id: Option<EvaluationId>,
        instance_id: Option<i32>,
    },

    #[error("The project file is missing for instance {instance_id}")]
    MissingProjectFile { instance_id: InstanceId },

    #[error("The node id for {project} changed from {from:?} to {to:?}")]
    NodeDrift {
        project: String,
        from: Option<NodeId>,
        to: Option<NodeId>,
    },

    #[error("The eval id for {project} changed from {from:?} to {to}")]
    EvaluationDrift {
        project: String,
        from: Option<EvaluationId>,
        to: EvaluationId,
    },

    #[error("A {event} event has no project context id")]
    MissingContextId { event: &'static str },

    #[error("Project context {context_id} already exists")]
    DuplicateContext { context_id: ContextId },

    #[error("Project context {context_id} finished but was never started")]
    UnknownFinishedContext { context_id: ContextId },

    #[error("Project context {context_id} finished more than once")]
    DoubleFinish { context_id: ContextId },

    #[error("Cannot find parent context {parent_context_id} of context {context_id}")]
    UnresolvedParent {
        context_id: ContextId,
        parent_context_id: ContextId,
    },
}

impl Violation {
    /// Stable short label, used for tabular output
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::MissingIdentity { .. } => "missing_identity",
            Violation::MissingProjectFile { .. } => "missing_project_file",
            Violation::NodeDrift { .. } => "node_drift",
            Violation::EvaluationDrift { .. } => "evaluation_drift",
            Violation::MissingContextId { .. } => "missing_context_id",
            Violation::DuplicateContext { .. } => "duplicate_context",
            Violation::UnknownFinishedContext { .. } => "unknown_finished_context",
            Violation::DoubleFinish { .. } => "double_finish",
            Violation::UnresolvedParent { .. } => "unresolved_parent",
        }
    }
}

/// Append-only list of violations, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationLog {
    violations: Vec<Violation>,
}

impl ViolationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, violation: Violation) {
        tracing::debug!(kind = violation.kind(), "{}", violation);
        self.violations.push(violation);
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.violations
    }

    /// Rendered diagnostic strings
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}
