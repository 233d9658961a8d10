//! Causality tree of project contexts
//!
//! Roots are contexts without a resolved parent. Each context lists the
//! contexts it requested, ascending by id, and the tree is flattened in
//! preorder with a depth per line:
//!
//! ```text
//! Project: dirs.proj Target Names: Build
//!   Project: App.csproj Target Names: Build
//!     Project: Lib.csproj Target Names: GetTargetPath;Build
//! ```

use crate::event::ContextId;
use crate::linker::LinkedBuild;
use serde::Serialize;
use std::collections::BTreeMap;

/// One line of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub depth: usize,
    pub context_id: ContextId,
    pub project_name: String,
    pub target_names: Vec<String>,
}

/// Preorder listing of every context reachable from a root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CausalityTree {
    nodes: Vec<TreeNode>,
}

impl CausalityTree {
    pub fn build(build: &LinkedBuild) -> Self {
        let graph = build.graph();
        let mut children: BTreeMap<ContextId, Vec<ContextId>> = BTreeMap::new();
        let mut roots = Vec::new();

        for context in graph.contexts() {
            match context.parent {
                Some(parent) => children.entry(parent).or_default().push(context.id),
                None => roots.push(context.id),
            }
        }

        let mut nodes = Vec::with_capacity(graph.context_count());
        // Reverse pushes keep ascending order when popping
        let mut stack: Vec<(ContextId, usize)> =
            roots.iter().rev().map(|&id| (id, 0)).collect();

        while let Some((context_id, depth)) = stack.pop() {
            let Some(context) = graph.context(context_id) else {
                continue;
            };
            nodes.push(TreeNode {
                depth,
                context_id,
                project_name: graph.project_name(context_id).to_string(),
                target_names: context.target_names.clone(),
            });

            if let Some(kids) = children.get(&context_id) {
                stack.extend(kids.iter().rev().map(|&id| (id, depth + 1)));
            }
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.depth == 0).count()
    }

    /// Indented text rendering, two spaces per level
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            out.push_str(&"  ".repeat(node.depth));
            out.push_str(&format!(
                "Project: {} Target Names: {}\n",
                node.project_name,
                node.target_names.join(";")
            ));
        }
        out
    }
}
