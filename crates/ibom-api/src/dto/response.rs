//! Response DTOs.

use plugin_altium_converter::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Body of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Artifact file name.
    pub filename: String,
    /// URL serving the artifact.
    pub url: String,
    /// Artifact path on the server's disk.
    pub file_path: String,
    /// `file://` form of `file_path`.
    pub file_url: String,
    /// Summary for display.
    pub message: String,
}

/// Body of a failed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFailure {
    /// Always `false`.
    pub success: bool,
    /// What went wrong, with remediation where known.
    pub error: String,
}

/// Current session status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Active workspace root, if any.
    pub temp_dir: Option<String>,
    /// Active workspace output directory, if any.
    pub output_dir: Option<String>,
    /// Always `true` once the server is answering.
    pub ready: bool,
    /// Conversion counters.
    pub conversions: MetricsSnapshot,
}

/// Body of a successful cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// Always `true`.
    pub success: bool,
}
