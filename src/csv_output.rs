//! CSV output format for analysis results
//!
//! One table per selected section, separated by a blank line. Stall
//! reports are flattened to one row per contributor; a stalled child
//! with no contributors still gets a single row with empty contributor
//! columns.

use crate::pipeline::{Analysis, Sections};
use crate::stall::{ContributorExecution, StallReport};
use crate::tree::CausalityTree;
use crate::violation::ViolationLog;

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(fields: &[String]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn violations_table(violations: &ViolationLog) -> String {
    let mut out = String::from("kind,message\n");
    for violation in violations.iter() {
        out.push_str(&row(&[
            violation.kind().to_string(),
            violation.to_string(),
        ]));
    }
    out
}

pub fn tree_table(tree: &CausalityTree) -> String {
    let mut out = String::from("depth,context_id,project,target_names\n");
    for node in tree.nodes() {
        out.push_str(&row(&[
            node.depth.to_string(),
            node.context_id.to_string(),
            node.project_name.clone(),
            node.target_names.join(";"),
        ]));
    }
    out
}

pub fn stalls_table(reports: &[StallReport]) -> String {
    let mut out = String::from(
        "task_context_id,task_id,project,node_id,containing_target,targets,wait_ms,\
         child_context_id,child_project,child_node_id,gap_ms,\
         contributor_context_id,contributor_project,contributor_node_id,contributor_targets,\
         contributor_start_ms,contributor_finish_ms,contributor_execution,contributor_duration_ms\n",
    );

    for report in reports {
        let task_fields = [
            report.task.context_id.to_string(),
            report.task.task_id.to_string(),
            report.project_name.clone(),
            optional(report.node_id),
            report.containing_target.clone().unwrap_or_default(),
            report.target_names.join(";"),
            report.wait_ms.to_string(),
        ];

        for child in &report.children {
            let mut child_fields = task_fields.to_vec();
            child_fields.extend([
                child.context_id.to_string(),
                child.project_name.clone(),
                optional(child.node_id),
                child.gap_ms.to_string(),
            ]);

            if child.contributors.is_empty() {
                let mut fields = child_fields;
                fields.extend(std::iter::repeat(String::new()).take(8));
                out.push_str(&row(&fields));
                continue;
            }

            for contributor in &child.contributors {
                let (execution, duration) = match contributor.execution {
                    ContributorExecution::Cached => ("cached", String::new()),
                    ContributorExecution::Executed { duration_ms } => {
                        ("executed", duration_ms.to_string())
                    }
                };

                let mut fields = child_fields.clone();
                fields.extend([
                    contributor.context_id.to_string(),
                    contributor.project_name.clone(),
                    optional(contributor.node_id),
                    contributor.target_names.join(";"),
                    contributor.start.as_millis().to_string(),
                    contributor.finish.as_millis().to_string(),
                    execution.to_string(),
                    duration,
                ]);
                out.push_str(&row(&fields));
            }
        }
    }
    out
}

/// Render the selected sections as CSV tables
pub fn render(analysis: &Analysis, sections: Sections) -> String {
    let mut tables = Vec::new();

    if sections.violations {
        tables.push(violations_table(analysis.violations()));
    }
    if sections.tree {
        tables.push(tree_table(analysis.tree()));
    }
    if sections.stalls {
        tables.push(stalls_table(analysis.stalls()));
    }

    tables.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ContextId, NodeId, TaskId, Timestamp};
    use crate::registry::CallOutKey;
    use crate::stall::{Contributor, StalledChild};
    use crate::violation::Violation;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_violations_table_quotes_messages() {
        let mut log = ViolationLog::new();
        log.record(Violation::UnresolvedParent {
            context_id: ContextId(4),
            parent_context_id: ContextId(9),
        });
        assert_eq!(
            violations_table(&log),
            "kind,message\nunresolved_parent,Cannot find parent context 9 of context 4\n"
        );
    }

    fn report(contributors: Vec<Contributor>) -> StallReport {
        StallReport {
            task: CallOutKey::new(ContextId(1), TaskId(3)),
            project_name: "App, Main.proj".to_string(),
            context_id: ContextId(1),
            node_id: Some(NodeId(1)),
            containing_target: None,
            target_names: vec!["Build".to_string(), "Pack".to_string()],
            start: Timestamp::from_secs(0),
            finish: Timestamp::from_secs(4),
            wait_ms: 4_000,
            children: vec![StalledChild {
                context_id: ContextId(2),
                project_name: "Lib.proj".to_string(),
                node_id: Some(NodeId(2)),
                start: Timestamp::from_secs(2),
                gap_ms: 2_000,
                contributors,
            }],
        }
    }

    #[test]
    fn test_stalls_table_row_per_contributor() {
        let contributors = vec![
            Contributor {
                context_id: ContextId(5),
                project_name: "Other.proj".to_string(),
                node_id: Some(NodeId(2)),
                target_names: vec!["Build".to_string()],
                start: Timestamp::from_millis(100),
                finish: Timestamp::from_millis(1_900),
                execution: ContributorExecution::Executed { duration_ms: 1_800 },
            },
            Contributor {
                context_id: ContextId(6),
                project_name: "Warm.proj".to_string(),
                node_id: Some(NodeId(2)),
                target_names: vec!["Build".to_string()],
                start: Timestamp::from_millis(1_900),
                finish: Timestamp::from_millis(1_950),
                execution: ContributorExecution::Cached,
            },
        ];
        let table = stalls_table(&[report(contributors)]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "1,3,\"App, Main.proj\",1,,Build;Pack,4000,2,Lib.proj,2,2000,5,Other.proj,2,Build,100,1900,executed,1800"
        );
        assert!(lines[2].ends_with(",6,Warm.proj,2,Build,1900,1950,cached,"));
    }

    #[test]
    fn test_stalls_table_child_without_contributors() {
        let table = stalls_table(&[report(Vec::new())]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(",2000,,,,,,,,"));
        let header_columns = lines[0].split(',').count();
        assert_eq!(lines[1].split(',').count(), header_columns + 1);
    }
}
