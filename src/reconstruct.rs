//! State reconstruction: folding the event stream into registries
//!
//! This is the first of the two construction phases. Each event is applied
//! exactly once, in order, to one explicit [`AnalysisState`]. The fold never
//! looks ahead, so references it cannot resolve yet (a child naming a parent
//! context that appears later) are stored as declared ids and left for
//! [`crate::linker::link`].
//!
//! # Example
//!
//! ```
//! use buildstall::config::AnalysisConfig;
//! use buildstall::event::{BuildEvent, EventContext, SkipReason, Timestamp};
//! use buildstall::reconstruct::ingest;
//!
//! let ctx = EventContext::new().node(1).evaluation(1).context(1);
//! let events = vec![
//!     BuildEvent::project_started(ctx, Timestamp::from_secs(0), "App.csproj", "Build"),
//!     BuildEvent::target_skipped(ctx, Timestamp::from_secs(1), "Build", SkipReason::OutputsUpToDate),
//!     BuildEvent::project_finished(ctx, Timestamp::from_secs(2)),
//! ];
//!
//! let ingested = ingest(&events, &AnalysisConfig::default());
//! assert_eq!(ingested.graph().context_count(), 1);
//! assert!(ingested.violations().is_empty());
//! ```

use crate::config::AnalysisConfig;
use crate::event::{
    split_names, BuildEvent, EventContext, EventKind, InstanceId, ParameterKind, SkipReason,
    Timestamp,
};
use crate::outcome::{is_cached_execution, TargetOutcome};
use crate::registry::{
    property_fingerprint, BuildGraph, CallOutKey, CallOutTask, ProjectContext, ProjectInstance,
};
use crate::violation::{Violation, ViolationLog};
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Registries and violations shared by the construction stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisState {
    pub graph: BuildGraph,
    pub violations: ViolationLog,
}

/// Output of the ingest stage: populated registries, parents not yet linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedBuild {
    state: AnalysisState,
}

impl IngestedBuild {
    pub fn graph(&self) -> &BuildGraph {
        &self.state.graph
    }

    pub fn violations(&self) -> &ViolationLog {
        &self.state.violations
    }

    pub(crate) fn into_state(self) -> AnalysisState {
        self.state
    }
}

/// Derive an instance identity from an event's context reference
///
/// The evaluation id takes precedence when both ids are present.
pub fn resolve_instance_id(context: &EventContext) -> Option<InstanceId> {
    match (context.evaluation_id, context.instance_id) {
        (None, None) => None,
        (None, Some(instance_id)) => Some(InstanceId(instance_id)),
        (Some(evaluation_id), _) => Some(InstanceId(evaluation_id.0)),
    }
}

/// Fold all events into an [`IngestedBuild`]
pub fn ingest<I>(events: I, config: &AnalysisConfig) -> IngestedBuild
where
    I: IntoIterator,
    I::Item: Borrow<BuildEvent>,
{
    let reconstructor = Reconstructor::new(config);
    let mut state = AnalysisState::default();
    let mut event_count = 0usize;

    for event in events {
        reconstructor.apply(&mut state, event.borrow());
        event_count += 1;
    }

    tracing::info!(
        events = event_count,
        instances = state.graph.instance_count(),
        contexts = state.graph.context_count(),
        tasks = state.graph.task_count(),
        violations = state.violations.len(),
        "ingested build events"
    );

    IngestedBuild { state }
}

/// Applies single events to an [`AnalysisState`]
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Reconstructor<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn apply(&self, state: &mut AnalysisState, event: &BuildEvent) {
        let ctx = &event.context;
        let at = event.timestamp;
        tracing::trace!(kind = event.kind_name(), context_id = ?ctx.context_id, %at, "apply");

        match &event.kind {
            EventKind::ProjectStarted {
                project_file,
                global_properties,
                target_names,
                parent,
            } => self.project_started(
                state,
                ctx,
                at,
                project_file.as_deref(),
                global_properties.as_ref(),
                target_names.as_deref(),
                parent.as_ref(),
            ),
            EventKind::ProjectFinished { .. } => self.project_finished(state, ctx, at),
            EventKind::TargetStarted { target_name } => {
                self.target_started(state, ctx, target_name)
            }
            EventKind::TargetFinished { target_name, .. } => {
                self.record_outcome(state, ctx, target_name, TargetOutcome::Executed)
            }
            EventKind::TargetSkipped {
                target_name,
                reason,
            } => self.target_skipped(state, ctx, target_name, *reason),
            EventKind::TaskStarted { task_name } => self.task_started(state, ctx, at, task_name),
            EventKind::TaskParameterInput {
                parameter_kind,
                item_type,
                items,
            } => self.task_parameter(state, ctx, *parameter_kind, item_type, items),
            EventKind::TaskFinished { .. } => self.task_finished(state, ctx, at),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn project_started(
        &self,
        state: &mut AnalysisState,
        ctx: &EventContext,
        at: Timestamp,
        project_file: Option<&str>,
        global_properties: Option<&BTreeMap<String, String>>,
        target_names: Option<&str>,
        parent: Option<&EventContext>,
    ) {
        let Some(context_id) = ctx.context_id else {
            state.violations.record(Violation::MissingContextId {
                event: "project_started",
            });
            return;
        };

        let Some(instance_id) = resolve_instance_id(ctx) else {
            state.violations.record(Violation::MissingIdentity {
                evaluation_id: ctx.evaluation_id,
                instance_id: ctx.instance_id,
            });
            return;
        };

        // First write wins
        if state.graph.contains_context(context_id) {
            state
                .violations
                .record(Violation::DuplicateContext { context_id });
            return;
        }

        match state.graph.instance(instance_id) {
            Some(instance) => {
                let mut drift = Vec::new();
                if instance.node_id != ctx.node_id {
                    drift.push(Violation::NodeDrift {
                        project: instance.name.clone(),
                        from: instance.node_id,
                        to: ctx.node_id,
                    });
                }
                if let Some(evaluation_id) = ctx.evaluation_id {
                    if instance.evaluation_id != Some(evaluation_id) {
                        drift.push(Violation::EvaluationDrift {
                            project: instance.name.clone(),
                            from: instance.evaluation_id,
                            to: evaluation_id,
                        });
                    }
                }
                for violation in drift {
                    state.violations.record(violation);
                }
            }
            None => {
                let file_path = match project_file.filter(|path| !path.is_empty()) {
                    Some(path) => path,
                    None => {
                        state
                            .violations
                            .record(Violation::MissingProjectFile { instance_id });
                        "<unknown>"
                    }
                };
                state.graph.insert_instance(ProjectInstance::new(
                    instance_id,
                    file_path,
                    ctx.node_id,
                    ctx.evaluation_id,
                    property_fingerprint(global_properties),
                ));
            }
        }

        let mut context = ProjectContext::new(
            context_id,
            instance_id,
            target_names.map(split_names).unwrap_or_default(),
            at,
        );
        if let Some(parent) = parent {
            context.parent_context_id = parent.context_id;
            context.parent_task_id = parent.task_id;
        }
        state.graph.insert_context(context);
    }

    fn project_finished(&self, state: &mut AnalysisState, ctx: &EventContext, at: Timestamp) {
        let Some(context_id) = ctx.context_id else {
            state.violations.record(Violation::MissingContextId {
                event: "project_finished",
            });
            return;
        };

        let Some(context) = state.graph.context_mut(context_id) else {
            state
                .violations
                .record(Violation::UnknownFinishedContext { context_id });
            return;
        };

        if context.finish.is_some() {
            state
                .violations
                .record(Violation::DoubleFinish { context_id });
            return;
        }

        context.finish = Some(at);
        context.is_cached_execution = is_cached_execution(&context.target_names, &context.outcomes);
    }

    fn target_started(&self, state: &mut AnalysisState, ctx: &EventContext, target_name: &str) {
        let (Some(context_id), Some(target_id)) = (ctx.context_id, ctx.target_id) else {
            tracing::debug!(target_name, "target start without context or target id");
            return;
        };

        match state.graph.context_mut(context_id) {
            Some(context) => {
                context
                    .started_targets
                    .insert(target_id, target_name.to_string());
            }
            None => tracing::debug!(%context_id, target_name, "target start for unknown context"),
        }
    }

    fn target_skipped(
        &self,
        state: &mut AnalysisState,
        ctx: &EventContext,
        target_name: &str,
        reason: SkipReason,
    ) {
        if self.config.is_cached_skip(reason) {
            self.record_outcome(state, ctx, target_name, TargetOutcome::Cached);
        }
    }

    fn record_outcome(
        &self,
        state: &mut AnalysisState,
        ctx: &EventContext,
        target_name: &str,
        outcome: TargetOutcome,
    ) {
        let context = ctx
            .context_id
            .and_then(|context_id| state.graph.context_mut(context_id));

        match context {
            Some(context) => context.outcomes.record(target_name, outcome),
            None => tracing::debug!(
                context_id = ?ctx.context_id,
                target_name,
                %outcome,
                "target outcome for unknown context"
            ),
        }
    }

    fn task_started(
        &self,
        state: &mut AnalysisState,
        ctx: &EventContext,
        at: Timestamp,
        task_name: &str,
    ) {
        if !self.config.is_call_out_task(task_name) {
            return;
        }

        let Some(key) = call_out_key(ctx) else {
            tracing::debug!(task_name, "call-out task without context or task id");
            return;
        };

        let Some(context) = state.graph.context(key.context_id) else {
            tracing::debug!(%key, "call-out task in unknown context");
            return;
        };

        if state.graph.task(key).is_some() {
            tracing::debug!(%key, "call-out task started twice");
            return;
        }

        let containing_target = ctx
            .target_id
            .and_then(|target_id| context.started_targets.get(&target_id).cloned());

        state
            .graph
            .insert_task(CallOutTask::new(key, containing_target, at));
    }

    fn task_parameter(
        &self,
        state: &mut AnalysisState,
        ctx: &EventContext,
        parameter_kind: ParameterKind,
        item_type: &str,
        items: &[String],
    ) {
        if parameter_kind != ParameterKind::TaskInput
            || !item_type.eq_ignore_ascii_case(&self.config.targets_parameter)
        {
            return;
        }

        let Some(task) = call_out_key(ctx).and_then(|key| state.graph.task_mut(key)) else {
            return;
        };

        task.target_names = items.iter().flat_map(|item| split_names(item)).collect();
    }

    fn task_finished(&self, state: &mut AnalysisState, ctx: &EventContext, at: Timestamp) {
        if let Some(task) = call_out_key(ctx).and_then(|key| state.graph.task_mut(key)) {
            task.finish = Some(at);
        }
    }
}

fn call_out_key(ctx: &EventContext) -> Option<CallOutKey> {
    Some(CallOutKey::new(ctx.context_id?, ctx.task_id?))
}
