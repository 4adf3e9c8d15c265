//! Board parser backed by an external Python board-dump script.
//!
//! The script is run as `<python> <script> <board> [extra args...]` with the
//! board's directory as working directory and must print a single JSON
//! document on stdout:
//!
//! ```json
//! {"pcbdata": {...}, "components": [{"ref": "R1", "val": "10k", ...}]}
//! ```
//!
//! `null` (or empty output) means the file held no board.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ibom_core::config::ParserConfig;
use plugin_altium_converter::executor::{ExecutionParams, ExecutorError, ProcessRunner};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::python::PythonDiscovery;
use super::{BackendError, BoardParser, Component, ParsedBoard};

#[derive(Debug, Deserialize)]
struct DumpOutput {
    pcbdata: serde_json::Value,
    #[serde(default)]
    components: Vec<Component>,
}

/// Parser that shells out to the board-dump script.
#[derive(Debug, Clone)]
pub struct ExternalBoardParser {
    config: ParserConfig,
    discovery: PythonDiscovery,
    runner: ProcessRunner,
}

impl ExternalBoardParser {
    /// Create a parser from configuration.
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            discovery: PythonDiscovery::new(),
            runner: ProcessRunner::default(),
        }
    }

    /// Replace the interpreter discovery.
    pub fn with_discovery(mut self, discovery: PythonDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    fn unavailable_message(&self) -> String {
        format!(
            "No Python interpreter with the KiCad API (pcbnew) was found. Install KiCad, or set \
             parser.python (IBOM__PARSER__PYTHON) to KiCad's Python, e.g. \
             /Applications/KiCad/KiCad.app/Contents/Frameworks/Python.framework/Versions/Current/bin/python3 \
             on macOS, kicad-python3 on Linux, or \"C:\\Program Files\\KiCad\\bin\\python.exe\" on Windows. \
             Board script: {}",
            self.config.script.display()
        )
    }
}

#[async_trait]
impl BoardParser for ExternalBoardParser {
    #[instrument(skip_all, fields(board = %board.display()))]
    async fn parse(&self, board: &Path) -> Result<Option<ParsedBoard>, BackendError> {
        let python = self
            .discovery
            .discover(self.config.python.as_deref())
            .ok_or_else(|| BackendError::InterpreterUnavailable(self.unavailable_message()))?;

        let interpreter = if python.path.components().count() > 1 {
            absolute(&python.path)?
        } else {
            python.path.clone()
        };
        let script = absolute(&self.config.script)?;
        let board = absolute(board)?;
        let board = board.as_path();

        let mut params = ExecutionParams::new(
            interpreter.as_os_str(),
            Duration::from_secs(self.config.timeout_seconds),
        )
        .arg(script.as_os_str())
        .arg(board.as_os_str())
        .args(&self.config.extra_args);
        if let Some(dir) = board.parent().filter(|d| !d.as_os_str().is_empty()) {
            params = params.current_dir(dir);
        }

        let output = match self.runner.run(&params).await {
            Ok(output) => output,
            Err(ExecutorError::Spawn { source, .. }) => {
                return Err(BackendError::InterpreterUnavailable(format!(
                    "Cannot run Python at {}: {source}. {}",
                    python.path.display(),
                    self.unavailable_message()
                )));
            }
            Err(ExecutorError::Timeout { timeout, .. }) => {
                return Err(BackendError::ParseFailed(format!(
                    "timed out after {}s",
                    timeout.as_secs()
                )));
            }
            Err(ExecutorError::ProcessFailed { code, stderr, .. }) => {
                return Err(BackendError::ParseFailed(format!(
                    "exit code {code}: {stderr}"
                )));
            }
        };

        let stdout = output.stdout.trim();
        if stdout.is_empty() || stdout == "null" {
            debug!("Parser reported no board");
            return Ok(None);
        }

        let dump: DumpOutput = serde_json::from_str(stdout)
            .map_err(|e| BackendError::InvalidOutput(e.to_string()))?;
        if dump.pcbdata.is_null() {
            return Ok(None);
        }

        debug!(components = dump.components.len(), "Parsed board");
        Ok(Some(ParsedBoard {
            board_data: dump.pcbdata,
            components: dump.components,
        }))
    }
}

/// The child runs in the board's directory, so every path it gets is
/// resolved against ours first.
fn absolute(path: &Path) -> Result<PathBuf, BackendError> {
    std::path::absolute(path)
        .map_err(|e| BackendError::ParseFailed(format!("cannot resolve {}: {e}", path.display())))
}
