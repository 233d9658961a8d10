// Stall detector: windowed causal-overlap search over node timelines

use super::report::{Contributor, ContributorExecution, StallReport, StalledChild};
use crate::config::AnalysisConfig;
use crate::event::{NodeId, Timestamp};
use crate::linker::LinkedBuild;
use crate::registry::{BuildGraph, CallOutTask, ProjectContext, ProjectInstance};
use crate::timeline::{NodeTimelineIndex, TimelineEntry};

/// Find every stalled call-out task in a linked build
///
/// # Example
///
/// ```
/// use buildstall::config::AnalysisConfig;
/// use buildstall::event::BuildEvent;
/// use buildstall::linker::link;
/// use buildstall::reconstruct::ingest;
/// use buildstall::stall::detect_stalls;
/// use buildstall::timeline::NodeTimelineIndex;
///
/// let config = AnalysisConfig::default();
/// let events: Vec<BuildEvent> = Vec::new();
/// let build = link(ingest(&events, &config));
/// let index = NodeTimelineIndex::build(&build);
///
/// assert!(detect_stalls(&build, &index, &config).is_empty());
/// ```
pub fn detect_stalls(
    build: &LinkedBuild,
    index: &NodeTimelineIndex,
    config: &AnalysisConfig,
) -> Vec<StallReport> {
    StallDetector::new(build, index, config).detect()
}

/// Correlates call-out tasks with the node timelines they waited on
#[derive(Debug, Clone, Copy)]
pub struct StallDetector<'a> {
    build: &'a LinkedBuild,
    index: &'a NodeTimelineIndex,
    config: &'a AnalysisConfig,
}

impl<'a> StallDetector<'a> {
    pub fn new(
        build: &'a LinkedBuild,
        index: &'a NodeTimelineIndex,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            build,
            index,
            config,
        }
    }

    fn graph(&self) -> &'a BuildGraph {
        self.build.graph()
    }

    /// Reports for all finished call-out tasks, ascending by task key
    pub fn detect(&self) -> Vec<StallReport> {
        let reports: Vec<StallReport> = self
            .graph()
            .tasks()
            .filter_map(|task| self.analyze_task(task))
            .collect();

        tracing::info!(
            tasks = self.graph().task_count(),
            stalls = reports.len(),
            "stall detection complete"
        );
        reports
    }

    /// Run every filter for one task; `None` when no child survives
    pub fn analyze_task(&self, task: &CallOutTask) -> Option<StallReport> {
        let graph = self.graph();
        let finish = task.finish?;

        let children: Vec<&ProjectContext> = task
            .children
            .iter()
            .filter_map(|&id| graph.context(id))
            .collect();

        if !children.iter().all(|child| child.is_cached_execution) {
            tracing::trace!(task = %task.key, "child computed real work");
            return None;
        }

        if task.target_names.is_empty() {
            tracing::trace!(task = %task.key, "unscoped call-out");
            return None;
        }

        let wait_ms = finish.millis_since(task.start);
        if wait_ms < self.config.min_wait_ms {
            tracing::trace!(task = %task.key, wait_ms, "below noise floor");
            return None;
        }

        let task_node = graph.node_of(task.key.context_id);
        if !self.is_waiting(task, finish, task_node) {
            tracing::trace!(task = %task.key, "node busy during wait");
            return None;
        }

        let mut stalled = Vec::new();
        for child in children {
            let gap_ms = child.start.millis_since(task.start);
            if gap_ms < self.config.min_wait_ms {
                continue;
            }

            let contributors = self.contributors(task, task_node, child);
            if self.is_false_cache_execution(task, child, &contributors) {
                tracing::debug!(
                    task = %task.key,
                    child = %child.id,
                    "suppressed false cache execution"
                );
                continue;
            }

            stalled.push(self.stalled_child(child, gap_ms, &contributors));
        }

        if stalled.is_empty() {
            return None;
        }

        Some(StallReport {
            task: task.key,
            project_name: graph.project_name(task.key.context_id).to_string(),
            context_id: task.key.context_id,
            node_id: task_node,
            containing_target: task.containing_target.clone(),
            target_names: task.target_names.clone(),
            start: task.start,
            finish,
            wait_ms,
            children: stalled,
        })
    }

    /// True when no other context started on the task's node mid-wait
    fn is_waiting(&self, task: &CallOutTask, finish: Timestamp, task_node: Option<NodeId>) -> bool {
        let Some(timeline) = task_node.and_then(|node| self.index.timeline(node)) else {
            return true;
        };

        !timeline
            .starting_within(task.start, finish)
            .any(|entry| entry.context_id != task.key.context_id)
    }

    /// Walk back from the child's start collecting in-window work on other nodes
    ///
    /// Returned oldest first.
    fn contributors(
        &self,
        task: &CallOutTask,
        task_node: Option<NodeId>,
        child: &ProjectContext,
    ) -> Vec<TimelineEntry> {
        let graph = self.graph();
        let Some(timeline) = graph
            .node_of(child.id)
            .and_then(|node| self.index.timeline(node))
        else {
            return Vec::new();
        };

        let before_child = &timeline.entries()[..timeline.count_before(child.start)];
        let mut stack = Vec::new();
        for entry in before_child.iter().rev() {
            if entry.finish < task.start {
                break;
            }
            if graph.node_of(entry.context_id) != task_node {
                stack.push(*entry);
            }
        }

        stack.reverse();
        stack
    }

    /// True when a same-project contributor executed a requested target
    fn is_false_cache_execution(
        &self,
        task: &CallOutTask,
        child: &ProjectContext,
        contributors: &[TimelineEntry],
    ) -> bool {
        let graph = self.graph();
        let Some(child_instance) = graph.instance_of(child.id) else {
            return false;
        };

        contributors
            .iter()
            .filter(|entry| {
                graph
                    .instance_of(entry.context_id)
                    .is_some_and(|instance| self.same_project(instance, child_instance))
            })
            .filter_map(|entry| graph.context(entry.context_id))
            .any(|context| context.outcomes.executed_any(&task.target_names))
    }

    fn same_project(&self, a: &ProjectInstance, b: &ProjectInstance) -> bool {
        a.file_path == b.file_path
            && (!self.config.match_contributors_by_fingerprint || a.key == b.key)
    }

    fn stalled_child(
        &self,
        child: &ProjectContext,
        gap_ms: i64,
        contributors: &[TimelineEntry],
    ) -> StalledChild {
        let graph = self.graph();
        StalledChild {
            context_id: child.id,
            project_name: graph.project_name(child.id).to_string(),
            node_id: graph.node_of(child.id),
            start: child.start,
            gap_ms,
            contributors: contributors
                .iter()
                .map(|entry| self.contributor(entry))
                .collect(),
        }
    }

    fn contributor(&self, entry: &TimelineEntry) -> Contributor {
        let graph = self.graph();
        let context = graph.context(entry.context_id);
        let execution = if context.is_some_and(|c| c.is_cached_execution) {
            ContributorExecution::Cached
        } else {
            ContributorExecution::Executed {
                duration_ms: entry.duration_ms(),
            }
        };

        Contributor {
            context_id: entry.context_id,
            project_name: graph.project_name(entry.context_id).to_string(),
            node_id: graph.node_of(entry.context_id),
            target_names: context
                .map(|c| c.target_names.clone())
                .unwrap_or_default(),
            start: entry.start,
            finish: entry.finish,
            execution,
        }
    }
}
