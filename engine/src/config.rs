//! Job configuration as supplied by callers.
//!
//! `JobConfig` is the unresolved input for a run. It can be built in code or
//! read from a TOML job file:
//!
//! ```toml
//! source = "~/Documents"
//! target = "/mnt/backup/documents"
//! overwrite = false
//! overwrite_condition = "duplicate"
//! ignored_ext = [".tmp", "log"]
//! ignored_directories = ["node_modules"]
//! dry_run = true
//! ```
//!
//! Type mistakes in the file (a number where a path is expected, a string
//! for `overwrite`) surface as `EngineError::Configuration` at load time.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::model::{OverwriteCondition, DEFAULT_RECENT_WINDOW_HOURS};

/// Unresolved configuration for one backup run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub source: PathBuf,
    pub target: PathBuf,

    #[serde(default)]
    pub overwrite: bool,

    #[serde(default)]
    pub overwrite_condition: OverwriteCondition,

    #[serde(default)]
    pub ignored_ext: Vec<String>,

    #[serde(default)]
    pub ignored_files: Vec<PathBuf>,

    #[serde(default)]
    pub ignored_directories: Vec<PathBuf>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: u64,
}

fn default_recent_window_hours() -> u64 {
    DEFAULT_RECENT_WINDOW_HOURS
}

impl JobConfig {
    /// Configuration with every option at its default.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        JobConfig {
            source: source.into(),
            target: target.into(),
            overwrite: false,
            overwrite_condition: OverwriteCondition::default(),
            ignored_ext: Vec::new(),
            ignored_files: Vec::new(),
            ignored_directories: Vec::new(),
            dry_run: false,
            recent_window_hours: DEFAULT_RECENT_WINDOW_HOURS,
        }
    }

    /// Parse a job from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::configuration(format!("Failed to parse job file: {}", e.message())))
    }

    /// Read and parse a TOML job file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!("Failed to read job file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
