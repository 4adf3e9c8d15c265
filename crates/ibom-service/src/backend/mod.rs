//! Board parsing and artifact generation collaborators.
//!
//! The pipeline only sees the [`BoardParser`] and [`ArtifactGenerator`]
//! traits; the production implementations run an external board-dump
//! script and render a self-contained HTML page.

pub mod generator;
pub mod parser;
pub mod python;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use generator::HtmlBomGenerator;
pub use parser::ExternalBoardParser;

/// A placed component as reported by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Reference designator, e.g. `R12`.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Value, e.g. `10k`.
    #[serde(default)]
    pub val: String,
    /// Footprint name.
    #[serde(default)]
    pub footprint: String,
    /// `F` (front) or `B` (back).
    #[serde(default)]
    pub layer: String,
    /// Placement attribute; `Virtual` components are not populated.
    #[serde(default)]
    pub attr: Option<String>,
    /// Additional named fields.
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

/// Output of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBoard {
    /// Opaque board data handed to the generator.
    pub board_data: serde_json::Value,
    /// Components on the board.
    pub components: Vec<Component>,
}

/// Errors from the parse and generate collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No interpreter able to run the parser exists.
    #[error("{0}")]
    InterpreterUnavailable(String),

    /// The parser ran and failed.
    #[error("Parser failed: {0}")]
    ParseFailed(String),

    /// The parser printed something that is not board JSON.
    #[error("Parser produced invalid output: {0}")]
    InvalidOutput(String),

    /// Rendering the artifact failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extracts board data and components from a board file.
#[async_trait]
pub trait BoardParser: Send + Sync {
    /// Parse `board`. `Ok(None)` means the file was read but held no board.
    async fn parse(&self, board: &Path) -> Result<Option<ParsedBoard>, BackendError>;
}

/// Renders a browsable artifact from parsed board data.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    /// Write the artifact for `source` into `output_dir`, returning its path.
    async fn generate(
        &self,
        board: ParsedBoard,
        source: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, BackendError>;
}
