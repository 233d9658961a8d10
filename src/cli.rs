//! CLI argument parsing for buildstall

use crate::pipeline::Sections;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "buildstall")]
#[command(version)]
#[command(
    about = "Reconstruct build causality from an event log and find cache stalls",
    long_about = None
)]
pub struct Cli {
    /// Print consistency violations found while reconstructing the build
    #[arg(short = 'v', long = "violations")]
    pub violations: bool,

    /// Print the project causality tree
    #[arg(short = 't', long = "tree")]
    pub tree: bool,

    /// Print detected cache stalls
    #[arg(short = 's', long = "stalls")]
    pub stalls: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Analysis configuration file (TOML)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Build event log in JSON Lines form
    #[arg(value_name = "EVENT_LOG", default_value = "build.events.jsonl")]
    pub event_log: PathBuf,
}

impl Cli {
    /// Requested sections; none requested means all
    pub fn sections(&self) -> Sections {
        Sections::select(self.violations, self.tree, self.stalls)
    }
}
