//! Causality linking: the second construction phase
//!
//! Runs once ingestion is complete, because a child's declared parent may
//! only appear later in the event stream. For each context, in ascending id
//! order:
//!
//! 1. resolve the declared parent context (unresolved parents are recorded
//!    as violations and the context stays a root),
//! 2. attach the context to the call-out task that requested it,
//! 3. place finished contexts on their instance's execution timeline.

use crate::reconstruct::{AnalysisState, IngestedBuild};
use crate::registry::{BuildGraph, CallOutKey};
use crate::timeline::TimelineEntry;
use crate::violation::{Violation, ViolationLog};

/// A fully linked build; read-only from here on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedBuild {
    state: AnalysisState,
}

impl LinkedBuild {
    pub fn graph(&self) -> &BuildGraph {
        &self.state.graph
    }

    pub fn violations(&self) -> &ViolationLog {
        &self.state.violations
    }
}

/// Resolve forward references left by ingestion
pub fn link(ingested: IngestedBuild) -> LinkedBuild {
    let mut state = ingested.into_state();
    let mut roots = 0usize;
    let mut attached = 0usize;

    for context_id in state.graph.context_ids() {
        let Some(context) = state.graph.context(context_id) else {
            continue;
        };
        let declared_parent = context.parent_context_id;
        let declared_task = context.parent_task_id;
        let instance_id = context.instance_id;
        let finished = context.finish.map(|finish| TimelineEntry {
            start: context.start,
            finish,
            context_id,
        });

        let mut parent = None;
        if let Some(parent_context_id) = declared_parent {
            if state.graph.contains_context(parent_context_id) {
                parent = Some(parent_context_id);
            } else {
                state.violations.record(Violation::UnresolvedParent {
                    context_id,
                    parent_context_id,
                });
            }
        }

        if let (Some(parent_context_id), Some(task_id)) = (declared_parent, declared_task) {
            if let Some(task) = state
                .graph
                .task_mut(CallOutKey::new(parent_context_id, task_id))
            {
                task.children.push(context_id);
                attached += 1;
            }
        }

        if let Some(context) = state.graph.context_mut(context_id) {
            context.parent = parent;
        }
        if parent.is_none() {
            roots += 1;
        }

        if let Some(entry) = finished {
            if let Some(instance) = state.graph.instance_mut(instance_id) {
                instance.executions.insert(entry);
            }
        }
    }

    tracing::info!(
        contexts = state.graph.context_count(),
        roots,
        attached_children = attached,
        "linked build graph"
    );

    LinkedBuild { state }
}
