// Stall report types

use crate::event::{ContextId, NodeId, Timestamp};
use crate::registry::CallOutKey;
use serde::Serialize;
use std::fmt;

/// Render signed milliseconds as seconds with millisecond precision
///
/// # Example
/// ```
/// use buildstall::stall::format_duration;
///
/// assert_eq!(format_duration(1500), "1.500s");
/// assert_eq!(format_duration(-250), "-0.250s");
/// ```
pub fn format_duration(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    format!("{}{}.{:03}s", sign, abs / 1000, abs % 1000)
}

/// How a contributing context obtained its results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributorExecution {
    /// All requested targets came from cache
    Cached,
    /// At least one requested target ran
    Executed { duration_ms: i64 },
}

impl fmt::Display for ContributorExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributorExecution::Cached => write!(f, "cached execution"),
            ContributorExecution::Executed { duration_ms } => {
                write!(f, "{}", format_duration(*duration_ms))
            }
        }
    }
}

/// A context that occupied the child's node during the wait window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub context_id: ContextId,
    pub project_name: String,
    pub node_id: Option<NodeId>,
    pub target_names: Vec<String>,
    pub start: Timestamp,
    pub finish: Timestamp,
    pub execution: ContributorExecution,
}

/// A cached child context the task waited on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalledChild {
    pub context_id: ContextId,
    pub project_name: String,
    pub node_id: Option<NodeId>,
    pub start: Timestamp,
    /// Time from task start to child start
    pub gap_ms: i64,
    /// Chronological, oldest first
    pub contributors: Vec<Contributor>,
}

/// A call-out task whose node idled on cache reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StallReport {
    pub task: CallOutKey,
    pub project_name: String,
    pub context_id: ContextId,
    pub node_id: Option<NodeId>,
    pub containing_target: Option<String>,
    pub target_names: Vec<String>,
    pub start: Timestamp,
    pub finish: Timestamp,
    /// Total task duration
    pub wait_ms: i64,
    pub children: Vec<StalledChild>,
}

impl StallReport {
    pub fn contributor_count(&self) -> usize {
        self.children.iter().map(|c| c.contributors.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0.000s");
        assert_eq!(format_duration(1), "0.001s");
        assert_eq!(format_duration(3_000), "3.000s");
        assert_eq!(format_duration(61_042), "61.042s");
        assert_eq!(format_duration(-5_000), "-5.000s");
    }

    #[test]
    fn test_execution_marker() {
        assert_eq!(ContributorExecution::Cached.to_string(), "cached execution");
        assert_eq!(
            ContributorExecution::Executed { duration_ms: 2_500 }.to_string(),
            "2.500s"
        );
    }
}
