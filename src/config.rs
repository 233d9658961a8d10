//! Analysis configuration
//!
//! Names and thresholds that steer the reconstructor and the stall detector.
//! Defaults match the build engine's conventions, so most runs need no file.
//!
//! # Example buildstall.toml
//!
//! ```toml
//! call_out_task = "MSBuild"
//! targets_parameter = "Targets"
//! min_wait_ms = 1000
//! cached_skip_reasons = ["previously_built_successfully", "outputs_up_to_date"]
//! match_contributors_by_fingerprint = false
//! ```

use crate::event::SkipReason;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Knobs for reconstruction and stall detection
///
/// # Example
/// ```
/// use buildstall::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.min_wait_ms, 1000);
/// assert_eq!(config.call_out_task, "MSBuild");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Task name that requests another project to build (case-insensitive)
    pub call_out_task: String,

    /// Item type of the call-out task input that lists requested targets
    pub targets_parameter: String,

    /// Noise floor for task durations and child start gaps
    ///
    /// Sub-threshold waits are never analyzed. Default: 1000 (one second)
    pub min_wait_ms: i64,

    /// Skip reasons that mean a target result came from cache
    pub cached_skip_reasons: Vec<SkipReason>,

    /// Also require an equal global-property fingerprint when matching a
    /// contributor to the stalled child's project
    ///
    /// Default: false (match on project file path only)
    pub match_contributors_by_fingerprint: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            call_out_task: "MSBuild".to_string(),
            targets_parameter: "Targets".to_string(),
            min_wait_ms: 1000,
            cached_skip_reasons: vec![
                SkipReason::PreviouslyBuiltSuccessfully,
                SkipReason::PreviouslyBuiltUnsuccessfully,
                SkipReason::OutputsUpToDate,
            ],
            match_contributors_by_fingerprint: false,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML string; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_out_task.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "call_out_task must not be empty".to_string(),
            ));
        }

        if self.targets_parameter.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "targets_parameter must not be empty".to_string(),
            ));
        }

        if self.min_wait_ms < 0 {
            return Err(ConfigError::Invalid(format!(
                "min_wait_ms must be >= 0, got {}",
                self.min_wait_ms
            )));
        }

        Ok(())
    }

    pub fn is_call_out_task(&self, task_name: &str) -> bool {
        task_name.eq_ignore_ascii_case(&self.call_out_task)
    }

    pub fn is_cached_skip(&self, reason: SkipReason) -> bool {
        self.cached_skip_reasons.contains(&reason)
    }
}
