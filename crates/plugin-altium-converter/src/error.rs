//! Error type for the Altium-to-KiCad conversion step.
//!
//! Every failure falls into one of two classes: the toolchain could not be
//! used at all ([`FailureClass::ToolchainUnavailable`]) or it ran and did
//! not produce a board ([`FailureClass::ConversionFailed`]).

use std::path::PathBuf;

use ibom_core::error::AppError;
use thiserror::Error;

/// Repository users are pointed at when the toolchain is missing.
pub const TOOLCHAIN_REPOSITORY: &str = "https://github.com/thesourcerer8/altium2kicad";

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The interpreter or the toolchain scripts are not reachable.
    ToolchainUnavailable,
    /// The toolchain ran but did not yield a usable board.
    ConversionFailed,
}

/// Unified error type for conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The file to convert does not exist.
    #[error("Source file not found: {path}")]
    SourceMissing {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Conversion is switched off in configuration.
    #[error(".PcbDoc conversion is disabled; export the design as .kicad_pcb and upload that")]
    Disabled,

    /// The script interpreter could not be run.
    #[error(
        "Interpreter '{interpreter}' is not available ({reason}). Install Perl and make sure it \
         is on PATH (Strawberry Perl on Windows), then retry the upload"
    )]
    InterpreterUnavailable {
        /// Configured interpreter command.
        interpreter: String,
        /// Why the probe failed.
        reason: String,
    },

    /// No directory holding the entry script was found.
    #[error(
        "altium2kicad toolchain not found ({} locations searched). To convert .PcbDoc files: \
         1) clone https://github.com/thesourcerer8/altium2kicad 2) place it next to the server executable, in \
         ~/altium2kicad, or on PATH 3) or export the design as .kicad_pcb and upload that instead",
        .searched.len()
    )]
    ToolchainNotFound {
        /// Candidate directories that were checked, in order.
        searched: Vec<PathBuf>,
    },

    /// The toolchain directory lacks a required script.
    #[error("altium2kicad toolchain at {dir} is incomplete: {missing} is missing")]
    ToolchainIncomplete {
        /// Toolchain directory that was found.
        dir: PathBuf,
        /// Name of the missing script.
        missing: String,
    },

    /// A toolchain script exited unsuccessfully.
    #[error("{step} failed with exit code {code}: {stderr}")]
    StepFailed {
        /// Script that failed.
        step: String,
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
        /// Captured (truncated) stderr.
        stderr: String,
        /// Captured (truncated) stdout.
        stdout: String,
    },

    /// A toolchain script exceeded its time limit and was killed.
    #[error("{step} timed out after {timeout_seconds}s")]
    StepTimeout {
        /// Script that timed out.
        step: String,
        /// The limit that was exceeded.
        timeout_seconds: u64,
    },

    /// The scripts succeeded but no `.kicad_pcb` was written.
    #[error("Conversion produced no .kicad_pcb file in {dir}")]
    OutputMissing {
        /// Scratch directory that was inspected.
        dir: PathBuf,
    },

    /// IO error while preparing or collecting files.
    #[error("IO error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Classify this error.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Disabled
            | Self::InterpreterUnavailable { .. }
            | Self::ToolchainNotFound { .. }
            | Self::ToolchainIncomplete { .. } => FailureClass::ToolchainUnavailable,
            _ => FailureClass::ConversionFailed,
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err.class() {
            FailureClass::ToolchainUnavailable => AppError::service_unavailable(err.to_string()),
            FailureClass::ConversionFailed => AppError::external_tool(err.to_string()),
        }
    }
}
