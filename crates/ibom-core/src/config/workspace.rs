//! Per-upload workspace configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Where upload workspaces are created and how stale ones are found again.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkspaceConfig {
    /// Parent directory for new workspaces. Defaults to the system temp dir.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Directory name prefix of every workspace.
    #[serde(default = "default_prefix")]
    #[validate(length(min = 1))]
    pub prefix: String,
    /// Name of the output subdirectory inside a workspace.
    #[serde(default = "default_output_subdir")]
    #[validate(length(min = 1))]
    pub output_subdir: String,
    /// Base for relative `temp_dir` form values.
    #[serde(default = "default_relative_base")]
    pub relative_base: PathBuf,
    /// Directory scanned when an artifact is missing from the registry.
    /// Defaults to the system temp dir.
    #[serde(default)]
    pub scan_root: Option<PathBuf>,
    /// Maximum number of workspace directories inspected per scan.
    #[serde(default = "default_scan_limit")]
    #[validate(range(min = 1, max = 100_000))]
    pub scan_limit: usize,
}

impl WorkspaceConfig {
    /// Effective workspace parent directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Effective fallback scan root.
    pub fn scan_root(&self) -> PathBuf {
        self.scan_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            prefix: default_prefix(),
            output_subdir: default_output_subdir(),
            relative_base: default_relative_base(),
            scan_root: None,
            scan_limit: default_scan_limit(),
        }
    }
}

fn default_prefix() -> String {
    "bom_".to_string()
}

fn default_output_subdir() -> String {
    "output".to_string()
}

fn default_relative_base() -> PathBuf {
    PathBuf::from(".")
}

fn default_scan_limit() -> usize {
    256
}
