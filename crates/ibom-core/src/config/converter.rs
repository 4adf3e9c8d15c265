//! Configuration for the Altium-to-KiCad conversion step.
//!
//! The converter drives the `altium2kicad` Perl toolchain. Nothing here is
//! resolved eagerly: the toolchain location is searched on every conversion
//! attempt so a toolchain installed while the server runs is picked up.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for locating and running the conversion toolchain.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Whether `.PcbDoc` uploads are converted at all.
    pub enabled: bool,

    /// Interpreter used to run the toolchain scripts.
    #[validate(length(min = 1))]
    pub interpreter: String,

    /// Arguments passed to the interpreter when probing for it.
    pub probe_args: Vec<String>,

    /// Timeout for the interpreter probe.
    #[validate(range(min = 1, max = 60))]
    pub probe_timeout_seconds: u64,

    /// Timeout for the unpack step.
    #[validate(range(min = 1, max = 3600))]
    pub unpack_timeout_seconds: u64,

    /// Timeout for the board conversion step.
    #[validate(range(min = 1, max = 3600))]
    pub convert_timeout_seconds: u64,

    /// Name of the toolchain directory (also the launcher name on `PATH`).
    #[validate(length(min = 1))]
    pub toolchain_dir_name: String,

    /// Mandatory entry-point script; its presence identifies a toolchain.
    #[validate(length(min = 1))]
    pub entry_script: String,

    /// Script that unpacks the binary design into intermediate files.
    #[validate(length(min = 1))]
    pub unpack_script: String,

    /// Directory holding a bundled toolchain. Defaults to the directory of
    /// the running executable.
    pub bundled_root: Option<PathBuf>,

    /// Additional directories checked after the conventional locations.
    pub extra_search_paths: Vec<PathBuf>,

    /// Maximum number of characters of child output kept in diagnostics.
    #[validate(range(min = 80))]
    pub max_diagnostic_chars: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interpreter: "perl".to_string(),
            probe_args: vec!["--version".to_string()],
            probe_timeout_seconds: 5,
            unpack_timeout_seconds: 60,
            convert_timeout_seconds: 120,
            toolchain_dir_name: "altium2kicad".to_string(),
            entry_script: "convertpcb.pl".to_string(),
            unpack_script: "unpack.pl".to_string(),
            bundled_root: None,
            extra_search_paths: Vec::new(),
            max_diagnostic_chars: 2000,
        }
    }
}

impl ConverterConfig {
    /// Resolve the effective bundled toolchain root.
    pub fn effective_bundled_root(&self) -> Option<PathBuf> {
        self.bundled_root.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(PathBuf::from))
        })
    }
}
