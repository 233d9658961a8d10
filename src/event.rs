//! Typed build events consumed by the reconstructor
//!
//! The analysis never decodes the build log's wire format itself. An external
//! reader (or [`crate::event_log`] for the JSON Lines form) hands over an
//! ordered sequence of [`BuildEvent`] values, each carrying the build's
//! context reference, a timestamp and a kind-specific payload.
//!
//! # Example
//!
//! ```
//! use buildstall::event::{BuildEvent, EventContext, Timestamp};
//!
//! let ctx = EventContext::new().node(1).evaluation(7).context(10);
//! let started = BuildEvent::project_started(ctx, Timestamp::from_secs(0), "src/app.csproj", "Build");
//! assert!(started.is_project_started());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! build_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

build_id!(
    /// Build worker that executed a project
    NodeId
);
build_id!(
    /// Evaluation of a project file under one global-property set
    EvaluationId
);
build_id!(
    /// Project instance identity as resolved by the reconstructor
    InstanceId
);
build_id!(
    /// One execution attempt of a project instance
    ContextId
);
build_id!(
    /// Task within a project context
    TaskId
);
build_id!(
    /// Target within a project context
    TargetId
);

/// Millisecond offset on the build log's clock
///
/// Offsets may be negative: only differences between timestamps carry
/// meaning for the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Signed milliseconds elapsed from `earlier` to `self`, saturating at the i64 bounds
    pub const fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Context reference attached to every build event
///
/// Every id is optional: the build uses sentinel values for "not applicable",
/// and decoders normalize those to `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<EvaluationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<ContextId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluation(mut self, id: i32) -> Self {
        self.evaluation_id = Some(EvaluationId(id));
        self
    }

    pub fn instance(mut self, id: i32) -> Self {
        self.instance_id = Some(id);
        self
    }

    pub fn context(mut self, id: i32) -> Self {
        self.context_id = Some(ContextId(id));
        self
    }

    pub fn task(mut self, id: i32) -> Self {
        self.task_id = Some(TaskId(id));
        self
    }

    pub fn target(mut self, id: i32) -> Self {
        self.target_id = Some(TargetId(id));
        self
    }

    pub fn node(mut self, id: i32) -> Self {
        self.node_id = Some(NodeId(id));
        self
    }
}

/// Why the build skipped a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PreviouslyBuiltSuccessfully,
    PreviouslyBuiltUnsuccessfully,
    OutputsUpToDate,
    ConditionWasFalse,
    None,
}

/// Direction of a logged task parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    TaskInput,
    TaskOutput,
    AddItem,
    RemoveItem,
    Other,
}

/// Kind-specific event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    ProjectStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_file: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        global_properties: Option<BTreeMap<String, String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_names: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<EventContext>,
    },
    ProjectFinished {
        #[serde(default = "default_true")]
        succeeded: bool,
    },
    TargetStarted {
        target_name: String,
    },
    TargetFinished {
        target_name: String,
        #[serde(default = "default_true")]
        succeeded: bool,
    },
    TargetSkipped {
        target_name: String,
        reason: SkipReason,
    },
    TaskStarted {
        task_name: String,
    },
    TaskParameterInput {
        parameter_kind: ParameterKind,
        item_type: String,
        #[serde(default)]
        items: Vec<String>,
    },
    TaskFinished {
        task_name: String,
        #[serde(default = "default_true")]
        succeeded: bool,
    },
}

fn default_true() -> bool {
    true
}

/// One decoded build event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub context: EventContext,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl BuildEvent {
    pub fn new(context: EventContext, timestamp: Timestamp, kind: EventKind) -> Self {
        Self {
            timestamp,
            context,
            kind,
        }
    }

    /// A root project start with no global properties
    pub fn project_started(
        context: EventContext,
        timestamp: Timestamp,
        project_file: impl Into<String>,
        target_names: impl Into<String>,
    ) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::ProjectStarted {
                project_file: Some(project_file.into()),
                global_properties: None,
                target_names: Some(target_names.into()),
                parent: None,
            },
        )
    }

    /// Attach the context reference of the requesting project and task
    ///
    /// Has no effect on events other than `ProjectStarted`.
    pub fn with_parent(mut self, parent_context: EventContext) -> Self {
        if let EventKind::ProjectStarted { parent, .. } = &mut self.kind {
            *parent = Some(parent_context);
        }
        self
    }

    /// Attach the global-property set; no effect on other kinds
    pub fn with_global_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if let EventKind::ProjectStarted {
            global_properties, ..
        } = &mut self.kind
        {
            *global_properties = Some(
                properties
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            );
        }
        self
    }

    pub fn project_finished(context: EventContext, timestamp: Timestamp) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::ProjectFinished { succeeded: true },
        )
    }

    pub fn target_started(
        context: EventContext,
        timestamp: Timestamp,
        target_name: impl Into<String>,
    ) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::TargetStarted {
                target_name: target_name.into(),
            },
        )
    }

    pub fn target_finished(
        context: EventContext,
        timestamp: Timestamp,
        target_name: impl Into<String>,
    ) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::TargetFinished {
                target_name: target_name.into(),
                succeeded: true,
            },
        )
    }

    pub fn target_skipped(
        context: EventContext,
        timestamp: Timestamp,
        target_name: impl Into<String>,
        reason: SkipReason,
    ) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::TargetSkipped {
                target_name: target_name.into(),
                reason,
            },
        )
    }

    pub fn task_started(
        context: EventContext,
        timestamp: Timestamp,
        task_name: impl Into<String>,
    ) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::TaskStarted {
                task_name: task_name.into(),
            },
        )
    }

    /// A task input parameter listing `items` under `item_type`
    pub fn task_input<I, S>(
        context: EventContext,
        timestamp: Timestamp,
        item_type: impl Into<String>,
        items: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            context,
            timestamp,
            EventKind::TaskParameterInput {
                parameter_kind: ParameterKind::TaskInput,
                item_type: item_type.into(),
                items: items.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn task_finished(
        context: EventContext,
        timestamp: Timestamp,
        task_name: impl Into<String>,
    ) -> Self {
        Self::new(
            context,
            timestamp,
            EventKind::TaskFinished {
                task_name: task_name.into(),
                succeeded: true,
            },
        )
    }

    pub fn is_project_started(&self) -> bool {
        matches!(self.kind, EventKind::ProjectStarted { .. })
    }

    /// Short kind label used in log lines
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::ProjectStarted { .. } => "project_started",
            EventKind::ProjectFinished { .. } => "project_finished",
            EventKind::TargetStarted { .. } => "target_started",
            EventKind::TargetFinished { .. } => "target_finished",
            EventKind::TargetSkipped { .. } => "target_skipped",
            EventKind::TaskStarted { .. } => "task_started",
            EventKind::TaskParameterInput { .. } => "task_parameter_input",
            EventKind::TaskFinished { .. } => "task_finished",
        }
    }
}

/// Split a delimited name list, dropping empty entries
///
/// Both the project-level target string (`"Build;Pack"`) and individual task
/// item specs use `;` as separator.
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
