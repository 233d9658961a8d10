//! Entity registries for a reconstructed build
//!
//! Three exclusive-owner stores keyed by build-assigned ids:
//!
//! - [`ProjectInstance`] by [`InstanceId`]
//! - [`ProjectContext`] by [`ContextId`]
//! - [`CallOutTask`] by [`CallOutKey`] (owning context, task id)
//!
//! Cross-entity references (owning instance, parent context, spawned
//! children) are stored as ids and resolved through [`BuildGraph`] at read
//! time, so no entity ever holds a live reference to another.

use crate::event::{ContextId, EvaluationId, InstanceId, NodeId, TargetId, TaskId, Timestamp};
use crate::outcome::OutcomeMap;
use crate::timeline::Timeline;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Fingerprint of a global-property set
///
/// Properties are serialized as sorted `key=value` lines and hashed with
/// SHA-256. An absent set has the empty fingerprint.
pub fn property_fingerprint(properties: Option<&BTreeMap<String, String>>) -> String {
    let Some(properties) = properties else {
        return String::new();
    };

    let mut hasher = Sha256::new();
    for (key, value) in properties {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode_upper(hasher.finalize())
}

/// File name component of a project path
///
/// Both `/` and `\` separate components, since logs are often produced on
/// another platform than the one analyzing them.
pub fn display_name(project_file: &str) -> String {
    project_file
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(project_file)
        .to_string()
}

/// One parameterized build of a project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInstance {
    pub id: InstanceId,
    pub file_path: String,
    pub name: String,
    pub node_id: Option<NodeId>,
    pub evaluation_id: Option<EvaluationId>,
    /// Global-property fingerprint, for display and equality only
    pub key: String,
    /// Finished contexts of this instance, filled in by the linker
    pub executions: Timeline,
}

impl ProjectInstance {
    pub fn new(
        id: InstanceId,
        file_path: impl Into<String>,
        node_id: Option<NodeId>,
        evaluation_id: Option<EvaluationId>,
        key: String,
    ) -> Self {
        let file_path = file_path.into();
        Self {
            id,
            name: display_name(&file_path),
            file_path,
            node_id,
            evaluation_id,
            key,
            executions: Timeline::new(),
        }
    }
}

impl fmt::Display for ProjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.key)
    }
}

/// One start-to-finish execution attempt of a project instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub id: ContextId,
    pub instance_id: InstanceId,
    pub target_names: Vec<String>,
    pub parent_context_id: Option<ContextId>,
    pub parent_task_id: Option<TaskId>,
    /// Set by the linker once the declared parent is found
    pub parent: Option<ContextId>,
    pub start: Timestamp,
    pub finish: Option<Timestamp>,
    pub outcomes: OutcomeMap,
    /// Targets started inside this context, for labelling call-out tasks
    pub started_targets: HashMap<TargetId, String>,
    /// Derived once at finish; false until then
    pub is_cached_execution: bool,
}

impl ProjectContext {
    pub fn new(
        id: ContextId,
        instance_id: InstanceId,
        target_names: Vec<String>,
        start: Timestamp,
    ) -> Self {
        Self {
            id,
            instance_id,
            target_names,
            parent_context_id: None,
            parent_task_id: None,
            parent: None,
            start,
            finish: None,
            outcomes: OutcomeMap::new(),
            started_targets: HashMap::new(),
            is_cached_execution: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finish.is_some()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finish.map(|finish| finish.millis_since(self.start))
    }

    pub fn target_list(&self) -> String {
        self.target_names.join(";")
    }
}

/// Identity of a call-out task: the context it runs in plus its task id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CallOutKey {
    pub context_id: ContextId,
    pub task_id: TaskId,
}

impl CallOutKey {
    pub fn new(context_id: ContextId, task_id: TaskId) -> Self {
        Self {
            context_id,
            task_id,
        }
    }
}

impl fmt::Display for CallOutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.context_id, self.task_id)
    }
}

/// A task asking other projects to build specific targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutTask {
    pub key: CallOutKey,
    pub target_names: Vec<String>,
    pub containing_target: Option<String>,
    pub start: Timestamp,
    pub finish: Option<Timestamp>,
    /// Contexts spawned by this request, filled in by the linker
    pub children: Vec<ContextId>,
}

impl CallOutTask {
    pub fn new(key: CallOutKey, containing_target: Option<String>, start: Timestamp) -> Self {
        Self {
            key,
            target_names: Vec::new(),
            containing_target,
            start,
            finish: None,
            children: Vec::new(),
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finish.map(|finish| finish.millis_since(self.start))
    }
}

/// The three registries of a reconstructed build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildGraph {
    instances: BTreeMap<InstanceId, ProjectInstance>,
    contexts: BTreeMap<ContextId, ProjectContext>,
    tasks: BTreeMap<CallOutKey, CallOutTask>,
}

impl BuildGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&ProjectInstance> {
        self.instances.get(&id)
    }

    pub fn context(&self, id: ContextId) -> Option<&ProjectContext> {
        self.contexts.get(&id)
    }

    pub fn task(&self, key: CallOutKey) -> Option<&CallOutTask> {
        self.tasks.get(&key)
    }

    /// Instances in ascending id order
    pub fn instances(&self) -> impl Iterator<Item = &ProjectInstance> {
        self.instances.values()
    }

    /// Contexts in ascending id order
    pub fn contexts(&self) -> impl Iterator<Item = &ProjectContext> {
        self.contexts.values()
    }

    /// Call-out tasks in ascending key order
    pub fn tasks(&self) -> impl Iterator<Item = &CallOutTask> {
        self.tasks.values()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Instance that owns a context
    pub fn instance_of(&self, context_id: ContextId) -> Option<&ProjectInstance> {
        self.context(context_id)
            .and_then(|context| self.instance(context.instance_id))
    }

    /// Node a context ran on, via its owning instance
    pub fn node_of(&self, context_id: ContextId) -> Option<NodeId> {
        self.instance_of(context_id)
            .and_then(|instance| instance.node_id)
    }

    /// Display name of a context's project
    pub fn project_name(&self, context_id: ContextId) -> &str {
        self.instance_of(context_id)
            .map(|instance| instance.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub(crate) fn contains_context(&self, id: ContextId) -> bool {
        self.contexts.contains_key(&id)
    }

    pub(crate) fn context_ids(&self) -> Vec<ContextId> {
        self.contexts.keys().copied().collect()
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Option<&mut ProjectInstance> {
        self.instances.get_mut(&id)
    }

    pub(crate) fn context_mut(&mut self, id: ContextId) -> Option<&mut ProjectContext> {
        self.contexts.get_mut(&id)
    }

    pub(crate) fn task_mut(&mut self, key: CallOutKey) -> Option<&mut CallOutTask> {
        self.tasks.get_mut(&key)
    }

    pub(crate) fn insert_instance(&mut self, instance: ProjectInstance) {
        self.instances.insert(instance.id, instance);
    }

    pub(crate) fn insert_context(&mut self, context: ProjectContext) {
        self.contexts.insert(context.id, context);
    }

    pub(crate) fn insert_task(&mut self, task: CallOutTask) {
        self.tasks.insert(task.key, task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_absent_is_empty() {
        assert_eq!(property_fingerprint(None), "");
    }

    #[test]
    fn test_fingerprint_is_order_insensitive_for_maps() {
        let mut a = BTreeMap::new();
        a.insert("Configuration".to_string(), "Debug".to_string());
        a.insert("Platform".to_string(), "x64".to_string());

        let mut b = BTreeMap::new();
        b.insert("Platform".to_string(), "x64".to_string());
        b.insert("Configuration".to_string(), "Debug".to_string());

        let key = property_fingerprint(Some(&a));
        assert_eq!(key, property_fingerprint(Some(&b)));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_fingerprint_distinguishes_values() {
        let mut debug = BTreeMap::new();
        debug.insert("Configuration".to_string(), "Debug".to_string());
        let mut release = BTreeMap::new();
        release.insert("Configuration".to_string(), "Release".to_string());

        assert_ne!(
            property_fingerprint(Some(&debug)),
            property_fingerprint(Some(&release))
        );
    }

    #[test]
    fn test_empty_property_set_hashes_empty_string() {
        // SHA-256 of ""
        assert_eq!(
            property_fingerprint(Some(&BTreeMap::new())),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("src/lib/Core.csproj"), "Core.csproj");
        assert_eq!(display_name("Core.csproj"), "Core.csproj");
        assert_eq!(display_name("C:\\src\\Core.csproj"), "Core.csproj");
    }

    #[test]
    fn test_graph_resolves_node_through_instance() {
        let mut graph = BuildGraph::new();
        graph.insert_instance(ProjectInstance::new(
            InstanceId(1),
            "a/App.csproj",
            Some(NodeId(3)),
            Some(EvaluationId(1)),
            String::new(),
        ));
        graph.insert_context(ProjectContext::new(
            ContextId(10),
            InstanceId(1),
            vec!["Build".to_string()],
            Timestamp::from_secs(0),
        ));

        assert_eq!(graph.node_of(ContextId(10)), Some(NodeId(3)));
        assert_eq!(graph.project_name(ContextId(10)), "App.csproj");
        assert_eq!(graph.project_name(ContextId(11)), "<unknown>");
        assert_eq!(graph.node_of(ContextId(11)), None);
    }
}
