//! JSON output format for analysis results
//!
//! Produces one document per run. Sections that were not selected are
//! omitted entirely rather than emitted as empty arrays.

use crate::pipeline::{Analysis, BuildSummary, Sections};
use crate::stall::StallReport;
use crate::tree::TreeNode;
use crate::violation::Violation;
use serde::Serialize;

/// Violation with its rendered message alongside the structured fields
#[derive(Debug, Clone, Serialize)]
pub struct JsonViolation<'a> {
    pub message: String,
    #[serde(flatten)]
    pub violation: &'a Violation,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Format version identifier
    pub version: &'static str,
    /// Format name
    pub format: &'static str,
    pub summary: BuildSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<JsonViolation<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<&'a [TreeNode]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stalls: Option<&'a [StallReport]>,
}

impl<'a> JsonOutput<'a> {
    pub fn new(analysis: &'a Analysis, sections: Sections) -> Self {
        let violations = sections.violations.then(|| {
            analysis
                .violations()
                .iter()
                .map(|violation| JsonViolation {
                    message: violation.to_string(),
                    violation,
                })
                .collect()
        });

        Self {
            version: env!("CARGO_PKG_VERSION"),
            format: "buildstall-json-v1",
            summary: analysis.summary(),
            violations,
            tree: sections.tree.then(|| analysis.tree().nodes()),
            stalls: sections.stalls.then(|| analysis.stalls()),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn render(analysis: &Analysis, sections: Sections) -> serde_json::Result<String> {
    JsonOutput::new(analysis, sections).to_json()
}
