//! Human-readable text reports

use crate::event::NodeId;
use crate::pipeline::{Analysis, Sections};
use crate::stall::{format_duration, StallReport};
use crate::violation::ViolationLog;

fn node_label(node: Option<NodeId>) -> String {
    node.map_or_else(|| "?".to_string(), |n| n.to_string())
}

/// Render the selected sections, each under a `=== Title ===` header
pub fn render(analysis: &Analysis, sections: Sections) -> String {
    let mut out = String::new();

    if sections.violations {
        out.push_str("=== Violations ===\n");
        out.push_str(&render_violations(analysis.violations()));
        out.push('\n');
    }

    if sections.tree {
        out.push_str("=== Causality Tree ===\n");
        if analysis.tree().is_empty() {
            out.push_str("No project contexts\n");
        } else {
            out.push_str(&analysis.tree().render());
        }
        out.push('\n');
    }

    if sections.stalls {
        out.push_str("=== Stalls ===\n");
        out.push_str(&render_stalls(analysis.stalls()));
        out.push('\n');
    }

    out
}

pub fn render_violations(violations: &ViolationLog) -> String {
    if violations.is_empty() {
        return "No violations\n".to_string();
    }

    violations
        .iter()
        .map(|v| format!("WARNING: {}\n", v))
        .collect()
}

pub fn render_stalls(reports: &[StallReport]) -> String {
    if reports.is_empty() {
        return "No stalls detected\n".to_string();
    }

    let mut out = String::new();
    for report in reports {
        out.push_str(&format!(
            "Stall: {} (context {}, node {}) target {} waited {} for {}\n",
            report.project_name,
            report.context_id,
            node_label(report.node_id),
            report.containing_target.as_deref().unwrap_or("<unknown>"),
            format_duration(report.wait_ms),
            report.target_names.join(";"),
        ));

        for child in &report.children {
            out.push_str(&format!(
                "  {} (context {}, node {}) started after {}\n",
                child.project_name,
                child.context_id,
                node_label(child.node_id),
                format_duration(child.gap_ms),
            ));

            for contributor in &child.contributors {
                out.push_str(&format!(
                    "    {} (context {}) Targets: {}: {}\n",
                    contributor.project_name,
                    contributor.context_id,
                    contributor.target_names.join(";"),
                    contributor.execution,
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ContextId, TaskId, Timestamp};
    use crate::registry::CallOutKey;
    use crate::stall::{Contributor, ContributorExecution, StalledChild};
    use crate::violation::Violation;

    fn sample_report() -> StallReport {
        StallReport {
            task: CallOutKey::new(ContextId(1), TaskId(7)),
            project_name: "App.csproj".to_string(),
            context_id: ContextId(1),
            node_id: Some(NodeId(1)),
            containing_target: Some("ResolveProjectReferences".to_string()),
            target_names: vec!["Build".to_string()],
            start: Timestamp::from_secs(0),
            finish: Timestamp::from_secs(5),
            wait_ms: 5_000,
            children: vec![StalledChild {
                context_id: ContextId(2),
                project_name: "Lib.csproj".to_string(),
                node_id: Some(NodeId(2)),
                start: Timestamp::from_secs(1),
                gap_ms: 1_000,
                contributors: vec![
                    Contributor {
                        context_id: ContextId(4),
                        project_name: "Other.csproj".to_string(),
                        node_id: Some(NodeId(2)),
                        target_names: vec!["Build".to_string()],
                        start: Timestamp::from_millis(-1_000),
                        finish: Timestamp::from_millis(500),
                        execution: ContributorExecution::Executed { duration_ms: 1_500 },
                    },
                    Contributor {
                        context_id: ContextId(5),
                        project_name: "Cache.csproj".to_string(),
                        node_id: None,
                        target_names: vec!["Build".to_string()],
                        start: Timestamp::from_millis(200),
                        finish: Timestamp::from_millis(900),
                        execution: ContributorExecution::Cached,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_render_stalls() {
        let expected = "\
Stall: App.csproj (context 1, node 1) target ResolveProjectReferences waited 5.000s for Build
  Lib.csproj (context 2, node 2) started after 1.000s
    Other.csproj (context 4) Targets: Build: 1.500s
    Cache.csproj (context 5) Targets: Build: cached execution
";
        assert_eq!(render_stalls(&[sample_report()]), expected);
    }

    #[test]
    fn test_render_empty_sections() {
        assert_eq!(render_stalls(&[]), "No stalls detected\n");
        assert_eq!(render_violations(&ViolationLog::new()), "No violations\n");
    }

    #[test]
    fn test_render_violations_prefix() {
        let mut log = ViolationLog::new();
        log.record(Violation::DoubleFinish {
            context_id: ContextId(3),
        });
        assert_eq!(
            render_violations(&log),
            "WARNING: Project context 3 finished more than once\n"
        );
    }
}
