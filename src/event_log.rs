//! JSON Lines event log decoder
//!
//! One [`BuildEvent`] per line, in log order. Blank lines are skipped.
//! Negative ids are the build's "not applicable" sentinels and are
//! normalized to `None` on the way in.

use crate::event::{BuildEvent, EventContext, EventKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("Failed to read event log {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and decode an event log from disk
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<BuildEvent>, EventLogError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| EventLogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let events = parse_events(&content)?;
    tracing::info!(path = %path.display(), events = events.len(), "event log loaded");
    Ok(events)
}

/// Decode JSON Lines text
///
/// # Example
///
/// ```
/// use buildstall::event_log::parse_events;
///
/// let log = r#"
/// {"timestamp": 0, "context": {"context_id": 1, "node_id": 1, "evaluation_id": 3}, "kind": "project_started", "project_file": "a.proj"}
///
/// {"timestamp": 1500, "context": {"context_id": 1}, "kind": "project_finished"}
/// "#;
///
/// let events = parse_events(log).unwrap();
/// assert_eq!(events.len(), 2);
/// ```
pub fn parse_events(content: &str) -> Result<Vec<BuildEvent>, EventLogError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<BuildEvent>(line)
                .map(normalize)
                .map_err(|source| EventLogError::Parse {
                    line: index + 1,
                    source,
                })
        })
        .collect()
}

fn normalize(mut event: BuildEvent) -> BuildEvent {
    event.context = normalize_context(event.context);
    if let EventKind::ProjectStarted {
        parent: Some(parent),
        ..
    } = &mut event.kind
    {
        *parent = normalize_context(*parent);
    }
    event
}

fn normalize_context(context: EventContext) -> EventContext {
    EventContext {
        evaluation_id: context.evaluation_id.filter(|id| id.0 >= 0),
        instance_id: context.instance_id.filter(|id| *id >= 0),
        context_id: context.context_id.filter(|id| id.0 >= 0),
        task_id: context.task_id.filter(|id| id.0 >= 0),
        target_id: context.target_id.filter(|id| id.0 >= 0),
        node_id: context.node_id.filter(|id| id.0 >= 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ContextId, NodeId, SkipReason, Timestamp};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_kinds() {
        let log = concat!(
            r#"{"timestamp": 0, "context": {"context_id": 2, "node_id": 1, "evaluation_id": 4}, "kind": "project_started", "project_file": "lib/Lib.proj", "target_names": "Build;Pack", "global_properties": {"Configuration": "Release"}}"#,
            "\n",
            r#"{"timestamp": 10, "context": {"context_id": 2, "target_id": 1}, "kind": "target_skipped", "target_name": "Build", "reason": "previously_built_successfully"}"#,
            "\n",
        );
        let events = parse_events(log).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].context.node_id, Some(NodeId(1)));
        match &events[0].kind {
            EventKind::ProjectStarted {
                project_file,
                target_names,
                global_properties,
                parent,
            } => {
                assert_eq!(project_file.as_deref(), Some("lib/Lib.proj"));
                assert_eq!(target_names.as_deref(), Some("Build;Pack"));
                assert_eq!(
                    global_properties.as_ref().and_then(|p| p.get("Configuration")),
                    Some(&"Release".to_string())
                );
                assert!(parent.is_none());
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(
            events[1].kind,
            EventKind::TargetSkipped {
                target_name: "Build".to_string(),
                reason: SkipReason::PreviouslyBuiltSuccessfully,
            }
        );
        assert_eq!(events[1].timestamp, Timestamp::from_millis(10));
    }

    #[test]
    fn test_sentinel_ids_normalized() {
        let log = r#"{"timestamp": 5, "context": {"context_id": 3, "node_id": -2, "evaluation_id": -1}, "kind": "project_started", "parent": {"context_id": -2, "task_id": -1}}"#;
        let events = parse_events(log).unwrap();
        let event = &events[0];

        assert_eq!(event.context.context_id, Some(ContextId(3)));
        assert_eq!(event.context.node_id, None);
        assert_eq!(event.context.evaluation_id, None);
        match event.kind {
            EventKind::ProjectStarted {
                parent: Some(parent),
                ..
            } => {
                assert_eq!(parent.context_id, None);
                assert_eq!(parent.task_id, None);
            }
            ref other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let log = "\n{\"timestamp\": 0, \"kind\": \"project_finished\"}\n{not json}\n";
        let err = parse_events(log).unwrap_err();
        match err {
            EventLogError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let log = r#"{"timestamp": 0, "kind": "message_raised"}"#;
        assert!(matches!(
            parse_events(log),
            Err(EventLogError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_read_events_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"timestamp": 0, "context": {{"context_id": 1}}, "kind": "project_finished", "succeeded": false}}"#
        )
        .unwrap();

        let events = read_events(file.path()).unwrap();
        assert_eq!(
            events[0].kind,
            EventKind::ProjectFinished { succeeded: false }
        );
    }

    #[test]
    fn test_read_events_missing_file() {
        let err = read_events("/nonexistent/build.events.jsonl").unwrap_err();
        assert!(matches!(err, EventLogError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/build.events.jsonl"));
    }
}
