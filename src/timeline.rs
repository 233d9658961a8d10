//! Start-ordered execution timelines
//!
//! A [`Timeline`] holds finished contexts sorted by `(start, context_id)`.
//! Equal start times are kept side by side and stay addressable by
//! position, which the stall detector relies on for its backward walks.
//!
//! [`NodeTimelineIndex`] groups every finished context by the node its
//! instance ran on. It is built once from a [`LinkedBuild`] and only read
//! afterwards.

use crate::event::{ContextId, NodeId, Timestamp};
use crate::linker::LinkedBuild;
use std::collections::BTreeMap;

/// One finished execution on a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub start: Timestamp,
    pub finish: Timestamp,
    pub context_id: ContextId,
}

impl TimelineEntry {
    pub fn duration_ms(&self) -> i64 {
        self.finish.millis_since(self.start)
    }

    fn sort_key(&self) -> (Timestamp, ContextId) {
        (self.start, self.context_id)
    }
}

/// Finished executions ordered by start time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping `(start, context_id)` order
    pub fn insert(&mut self, entry: TimelineEntry) {
        let key = entry.sort_key();
        let pos = self.entries.partition_point(|e| e.sort_key() <= key);
        self.entries.insert(pos, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    /// Position of the first entry starting strictly after `time`
    pub fn first_after(&self, time: Timestamp) -> usize {
        self.entries.partition_point(|e| e.start <= time)
    }

    /// Number of entries starting strictly before `time`
    pub fn count_before(&self, time: Timestamp) -> usize {
        self.entries.partition_point(|e| e.start < time)
    }

    /// Entries starting strictly inside `(after, before)`
    pub fn starting_within(
        &self,
        after: Timestamp,
        before: Timestamp,
    ) -> impl Iterator<Item = &TimelineEntry> {
        self.entries[self.first_after(after)..]
            .iter()
            .take_while(move |e| e.start < before)
    }
}

/// Per-node timelines of finished contexts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTimelineIndex {
    nodes: BTreeMap<NodeId, Timeline>,
}

impl NodeTimelineIndex {
    /// Index every finished context under its instance's node
    ///
    /// Contexts whose instance has no node id are left out.
    pub fn build(build: &LinkedBuild) -> Self {
        let graph = build.graph();
        let mut nodes: BTreeMap<NodeId, Timeline> = BTreeMap::new();

        for context in graph.contexts() {
            let Some(finish) = context.finish else {
                continue;
            };
            let Some(node_id) = graph.node_of(context.id) else {
                continue;
            };
            nodes.entry(node_id).or_default().insert(TimelineEntry {
                start: context.start,
                finish,
                context_id: context.id,
            });
        }

        tracing::info!(nodes = nodes.len(), "built node timeline index");
        Self { nodes }
    }

    pub fn timeline(&self, node_id: NodeId) -> Option<&Timeline> {
        self.nodes.get(&node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Timeline)> {
        self.nodes.iter().map(|(id, timeline)| (*id, timeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: i64, finish: i64, id: i32) -> TimelineEntry {
        TimelineEntry {
            start: Timestamp::from_secs(start),
            finish: Timestamp::from_secs(finish),
            context_id: ContextId(id),
        }
    }

    #[test]
    fn test_insert_keeps_start_order() {
        let mut timeline = Timeline::new();
        timeline.insert(entry(5, 6, 1));
        timeline.insert(entry(-3, 0, 2));
        timeline.insert(entry(2, 9, 3));

        let ids: Vec<i32> = timeline.iter().map(|e| e.context_id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_duplicate_starts_retrievable_by_index() {
        let mut timeline = Timeline::new();
        timeline.insert(entry(1, 2, 8));
        timeline.insert(entry(1, 3, 4));
        timeline.insert(entry(1, 4, 6));

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.get(0).unwrap().context_id, ContextId(4));
        assert_eq!(timeline.get(1).unwrap().context_id, ContextId(6));
        assert_eq!(timeline.get(2).unwrap().context_id, ContextId(8));
    }

    #[test]
    fn test_range_queries() {
        let mut timeline = Timeline::new();
        timeline.insert(entry(0, 1, 1));
        timeline.insert(entry(2, 3, 2));
        timeline.insert(entry(5, 6, 3));

        assert_eq!(timeline.first_after(Timestamp::from_secs(0)), 1);
        assert_eq!(timeline.first_after(Timestamp::from_secs(-1)), 0);
        assert_eq!(timeline.count_before(Timestamp::from_secs(2)), 1);
        assert_eq!(timeline.count_before(Timestamp::from_secs(10)), 3);

        let inside: Vec<i32> = timeline
            .starting_within(Timestamp::from_secs(0), Timestamp::from_secs(5))
            .map(|e| e.context_id.0)
            .collect();
        assert_eq!(inside, vec![2]);
    }

    #[test]
    fn test_window_bounds_are_exclusive() {
        let mut timeline = Timeline::new();
        timeline.insert(entry(0, 1, 1));
        timeline.insert(entry(5, 6, 2));

        let inside = timeline
            .starting_within(Timestamp::from_secs(0), Timestamp::from_secs(5))
            .count();
        assert_eq!(inside, 0);
    }
}
