//! Board parser collaborator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for the external board-dump process.
///
/// The parser is a Python script run with a KiCad-capable interpreter that
/// prints `{"pcbdata": ..., "components": [...]}` on stdout.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Explicit interpreter. When unset, KiCad installs are searched and
    /// `python3` on `PATH` is the last resort.
    pub python: Option<PathBuf>,
    /// Board-dump script passed to the interpreter.
    pub script: PathBuf,
    /// Timeout for a single parse.
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: u64,
    /// Extra arguments appended after the board path.
    pub extra_args: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            python: None,
            script: PathBuf::from("scripts/dump_board.py"),
            timeout_seconds: 120,
            extra_args: Vec::new(),
        }
    }
}
