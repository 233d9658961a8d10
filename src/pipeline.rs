//! Staged analysis driver: ingest → link → index → detect
//!
//! Each stage consumes or borrows the previous stage's output, so the
//! ordering cannot be violated by callers.
//!
//! # Example
//!
//! ```
//! use buildstall::config::AnalysisConfig;
//! use buildstall::event::{BuildEvent, EventContext, Timestamp};
//! use buildstall::pipeline::Analysis;
//!
//! let ctx = EventContext::new().node(1).evaluation(1).context(1);
//! let events = vec![
//!     BuildEvent::project_started(ctx, Timestamp::from_secs(0), "dirs.proj", "Build"),
//!     BuildEvent::project_finished(ctx, Timestamp::from_secs(3)),
//! ];
//!
//! let analysis = Analysis::run(&events, &AnalysisConfig::default());
//! assert_eq!(analysis.summary().contexts, 1);
//! assert!(analysis.stalls().is_empty());
//! ```

use crate::config::AnalysisConfig;
use crate::event::BuildEvent;
use crate::linker::{link, LinkedBuild};
use crate::reconstruct::ingest;
use crate::stall::{detect_stalls, StallReport};
use crate::timeline::NodeTimelineIndex;
use crate::tree::CausalityTree;
use crate::violation::ViolationLog;
use serde::Serialize;
use std::borrow::Borrow;

/// Which report sections to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub violations: bool,
    pub tree: bool,
    pub stalls: bool,
}

impl Sections {
    pub const ALL: Sections = Sections {
        violations: true,
        tree: true,
        stalls: true,
    };

    /// Explicit selection; selecting nothing means everything
    pub fn select(violations: bool, tree: bool, stalls: bool) -> Self {
        if !(violations || tree || stalls) {
            return Self::ALL;
        }
        Self {
            violations,
            tree,
            stalls,
        }
    }
}

impl Default for Sections {
    fn default() -> Self {
        Self::ALL
    }
}

/// Entity counts for a finished analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub instances: usize,
    pub contexts: usize,
    pub finished_contexts: usize,
    pub cached_contexts: usize,
    pub call_out_tasks: usize,
    pub nodes: usize,
    pub violations: usize,
    pub stalls: usize,
}

/// Every product of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    build: LinkedBuild,
    index: NodeTimelineIndex,
    tree: CausalityTree,
    stalls: Vec<StallReport>,
}

impl Analysis {
    pub fn run<I>(events: I, config: &AnalysisConfig) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<BuildEvent>,
    {
        let build = link(ingest(events, config));
        let index = NodeTimelineIndex::build(&build);
        let tree = CausalityTree::build(&build);
        let stalls = detect_stalls(&build, &index, config);

        Self {
            build,
            index,
            tree,
            stalls,
        }
    }

    pub fn build(&self) -> &LinkedBuild {
        &self.build
    }

    pub fn index(&self) -> &NodeTimelineIndex {
        &self.index
    }

    pub fn violations(&self) -> &ViolationLog {
        self.build.violations()
    }

    pub fn tree(&self) -> &CausalityTree {
        &self.tree
    }

    pub fn stalls(&self) -> &[StallReport] {
        &self.stalls
    }

    pub fn summary(&self) -> BuildSummary {
        let graph = self.build.graph();
        BuildSummary {
            instances: graph.instance_count(),
            contexts: graph.context_count(),
            finished_contexts: graph.contexts().filter(|c| c.is_finished()).count(),
            cached_contexts: graph.contexts().filter(|c| c.is_cached_execution).count(),
            call_out_tasks: graph.task_count(),
            nodes: self.index.node_count(),
            violations: self.violations().len(),
            stalls: self.stalls.len(),
        }
    }
}
