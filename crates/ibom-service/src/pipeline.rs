//! Upload processing pipeline: classify, convert, parse, generate, register.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugin_altium_converter::{ConversionError, ConvertedBoard, FailureClass, SourceConverter};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::backend::{ArtifactGenerator, BackendError, BoardParser};
use crate::format::{ACCEPTED_FORMATS, BoardFormat, describe_extension};
use crate::registry::SessionStore;
use crate::workspace::Workspace;

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The upload is not a supported board format.
    UnsupportedFormat,
    /// A required external tool is missing.
    ToolchainUnavailable,
    /// The converter ran and failed.
    ConversionFailed,
    /// The board could not be parsed or held no components.
    ParseFailure,
    /// The artifact could not be produced.
    GenerationFailure,
}

impl FailureKind {
    /// HTTP status code reported for this failure.
    pub fn status_code(self) -> u16 {
        match self {
            Self::UnsupportedFormat => 415,
            Self::ToolchainUnavailable => 503,
            Self::ConversionFailed => 502,
            Self::ParseFailure => 422,
            Self::GenerationFailure => 500,
        }
    }
}

/// A failed pipeline run with a message fit for the user.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineError {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
}

impl PipelineError {
    /// Create an error.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ConversionError> for PipelineError {
    fn from(err: ConversionError) -> Self {
        let kind = match err.class() {
            FailureClass::ToolchainUnavailable => FailureKind::ToolchainUnavailable,
            FailureClass::ConversionFailed => FailureKind::ConversionFailed,
        };
        Self::new(kind, err.to_string())
    }
}

/// A successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// File name of the generated artifact.
    pub artifact_name: String,
    /// Full path of the generated artifact.
    pub artifact_path: PathBuf,
    /// Number of components on the board.
    pub component_count: usize,
    /// Conversion result when the upload needed one.
    pub converted: Option<ConvertedBoard>,
}

/// Coordinates the collaborators for one upload.
#[derive(Clone)]
pub struct PipelineService {
    converter: Arc<dyn SourceConverter>,
    parser: Arc<dyn BoardParser>,
    generator: Arc<dyn ArtifactGenerator>,
    sessions: Arc<SessionStore>,
}

impl std::fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineService").finish()
    }
}

impl PipelineService {
    /// Create a pipeline over the given collaborators.
    pub fn new(
        converter: Arc<dyn SourceConverter>,
        parser: Arc<dyn BoardParser>,
        generator: Arc<dyn ArtifactGenerator>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            converter,
            parser,
            generator,
            sessions,
        }
    }

    /// Process an uploaded board saved inside `workspace`.
    ///
    /// Runs on its own task; a panic in any collaborator is reported as a
    /// generation failure instead of tearing down the caller.
    pub async fn process(
        &self,
        upload: &Path,
        workspace: &Workspace,
    ) -> Result<PipelineOutcome, PipelineError> {
        let this = self.clone();
        let upload = upload.to_path_buf();
        let workspace = workspace.clone();

        match tokio::spawn(async move { this.run(&upload, &workspace).await }).await {
            Ok(result) => result,
            Err(join_err) => {
                error!(error = %join_err, "Pipeline task aborted");
                Err(PipelineError::new(
                    FailureKind::GenerationFailure,
                    format!("Error processing file: {join_err}"),
                ))
            }
        }
    }

    #[instrument(skip_all, fields(upload = %upload.display()))]
    async fn run(
        &self,
        upload: &Path,
        workspace: &Workspace,
    ) -> Result<PipelineOutcome, PipelineError> {
        let format = BoardFormat::from_path(upload).ok_or_else(|| {
            PipelineError::new(
                FailureKind::UnsupportedFormat,
                format!(
                    "Unsupported file format: {}. Please upload one of: {ACCEPTED_FORMATS}",
                    describe_extension(upload)
                ),
            )
        })?;
        info!(format = format.display_name(), "Processing upload");

        let (board_path, converted) = if format.requires_conversion() {
            let converted = self.converter.convert(upload).await?;
            (converted.path.clone(), Some(converted))
        } else {
            (upload.to_path_buf(), None)
        };

        let parsed = self
            .parser
            .parse(&board_path)
            .await
            .map_err(|e| match e {
                BackendError::InterpreterUnavailable(msg) => {
                    PipelineError::new(FailureKind::ToolchainUnavailable, msg)
                }
                other => PipelineError::new(
                    FailureKind::ParseFailure,
                    format!("Failed to parse the PCB file: {other}"),
                ),
            })?
            .filter(|board| !board.components.is_empty())
            .ok_or_else(|| {
                warn!("Parser returned no board or no components");
                PipelineError::new(
                    FailureKind::ParseFailure,
                    "Failed to parse the PCB file. Please check the file and try again.",
                )
            })?;
        let component_count = parsed.components.len();

        let artifact_path = self
            .generator
            .generate(parsed, upload, &workspace.output_path)
            .await
            .map_err(|e| {
                PipelineError::new(
                    FailureKind::GenerationFailure,
                    format!("Error generating BOM: {e}"),
                )
            })?;
        let artifact_name = artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PipelineError::new(FailureKind::GenerationFailure, "Generator returned no file name")
            })?;

        let dir = artifact_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.output_path.clone());
        self.sessions.register(artifact_name.clone(), dir).await;

        info!(artifact = %artifact_name, components = component_count, "Pipeline completed");
        Ok(PipelineOutcome {
            artifact_name,
            artifact_path,
            component_count,
            converted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Component, ParsedBoard};
    use async_trait::async_trait;
    use ibom_core::config::WorkspaceConfig;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConverter {
        calls: AtomicUsize,
        fail_unavailable: bool,
    }

    #[async_trait]
    impl SourceConverter for CountingConverter {
        async fn convert(&self, source: &Path) -> Result<ConvertedBoard, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_unavailable {
                return Err(ConversionError::ToolchainNotFound { searched: vec![] });
            }
            let out = source.with_extension("kicad_pcb");
            std::fs::write(&out, "(kicad_pcb)")?;
            Ok(ConvertedBoard {
                path: out,
                reused_cached: false,
            })
        }
    }

    enum ParserBehaviour {
        Components(usize),
        NoBoard,
        NoInterpreter,
        Panic,
    }

    struct FakeParser(ParserBehaviour);

    #[async_trait]
    impl BoardParser for FakeParser {
        async fn parse(&self, _board: &Path) -> Result<Option<ParsedBoard>, BackendError> {
            match self.0 {
                ParserBehaviour::Components(n) => Ok(Some(ParsedBoard {
                    board_data: serde_json::json!({}),
                    components: (0..n)
                        .map(|i| Component {
                            reference: format!("R{i}"),
                            val: "1k".into(),
                            footprint: "R_0603".into(),
                            layer: "F".into(),
                            attr: None,
                            extra_fields: BTreeMap::new(),
                        })
                        .collect(),
                })),
                ParserBehaviour::NoBoard => Ok(None),
                ParserBehaviour::NoInterpreter => {
                    Err(BackendError::InterpreterUnavailable("no python".into()))
                }
                ParserBehaviour::Panic => panic!("parser exploded"),
            }
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl ArtifactGenerator for FakeGenerator {
        async fn generate(
            &self,
            board: ParsedBoard,
            source: &Path,
            output_dir: &Path,
        ) -> Result<PathBuf, BackendError> {
            let stem = source.file_stem().unwrap_or_default().to_string_lossy();
            let path = output_dir.join(format!("{stem}_iBoM.html"));
            tokio::fs::write(&path, format!("{} parts", board.components.len())).await?;
            Ok(path)
        }
    }

    struct Setup {
        _base: tempfile::TempDir,
        workspace: Workspace,
        sessions: Arc<SessionStore>,
        converter: Arc<CountingConverter>,
    }

    fn setup(converter: CountingConverter) -> Setup {
        let base = tempfile::tempdir().expect("tempdir");
        let root_path = base.path().join("bom_test");
        let output_path = root_path.join("output");
        std::fs::create_dir_all(&output_path).expect("mkdir");
        let sessions = Arc::new(SessionStore::new(&WorkspaceConfig {
            scan_root: Some(base.path().join("none")),
            ..WorkspaceConfig::default()
        }));
        Setup {
            _base: base,
            workspace: Workspace {
                root_path,
                output_path,
            },
            sessions,
            converter: Arc::new(converter),
        }
    }

    fn pipeline(s: &Setup, parser: ParserBehaviour) -> PipelineService {
        PipelineService::new(
            s.converter.clone(),
            Arc::new(FakeParser(parser)),
            Arc::new(FakeGenerator),
            s.sessions.clone(),
        )
    }

    fn upload(s: &Setup, name: &str) -> PathBuf {
        let path = s.workspace.root_path.join(name);
        std::fs::write(&path, "data").expect("write");
        path
    }

    #[tokio::test]
    async fn test_native_board_success() {
        let s = setup(CountingConverter::default());
        let path = upload(&s, "board.kicad_pcb");

        let outcome = pipeline(&s, ParserBehaviour::Components(3))
            .process(&path, &s.workspace)
            .await
            .expect("process");
        assert_eq!(outcome.artifact_name, "board_iBoM.html");
        assert_eq!(outcome.component_count, 3);
        assert!(outcome.converted.is_none());
        assert_eq!(s.converter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            s.sessions.resolve("board_iBoM.html").await,
            Some(s.workspace.output_path.join("board_iBoM.html"))
        );
    }

    #[tokio::test]
    async fn test_pcbdoc_is_converted() {
        let s = setup(CountingConverter::default());
        let path = upload(&s, "board.PcbDoc");

        let outcome = pipeline(&s, ParserBehaviour::Components(1))
            .process(&path, &s.workspace)
            .await
            .expect("process");
        assert_eq!(s.converter.calls.load(Ordering::SeqCst), 1);
        let converted = outcome.converted.expect("converted");
        assert_eq!(converted.path, s.workspace.root_path.join("board.kicad_pcb"));
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let s = setup(CountingConverter::default());
        let path = upload(&s, "board.unsupported_ext");

        let err = pipeline(&s, ParserBehaviour::Components(1))
            .process(&path, &s.workspace)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind, FailureKind::UnsupportedFormat);
        assert_eq!(err.kind.status_code(), 415);
        assert!(err.message.contains(".PcbDoc"));
        assert!(err.message.contains(".kicad_pcb"));
        assert_eq!(s.converter.calls.load(Ordering::SeqCst), 0);
        assert!(s.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_toolchain_unavailable_is_terminal() {
        let s = setup(CountingConverter {
            fail_unavailable: true,
            ..CountingConverter::default()
        });
        let path = upload(&s, "board.PcbDoc");

        let err = pipeline(&s, ParserBehaviour::Components(1))
            .process(&path, &s.workspace)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind, FailureKind::ToolchainUnavailable);
        assert_eq!(err.kind.status_code(), 503);
    }

    #[tokio::test]
    async fn test_empty_board_is_parse_failure() {
        let s = setup(CountingConverter::default());
        let path = upload(&s, "board.kicad_pcb");

        for behaviour in [ParserBehaviour::Components(0), ParserBehaviour::NoBoard] {
            let err = pipeline(&s, behaviour)
                .process(&path, &s.workspace)
                .await
                .expect_err("should fail");
            assert_eq!(err.kind, FailureKind::ParseFailure);
        }
    }

    #[tokio::test]
    async fn test_missing_parser_interpreter() {
        let s = setup(CountingConverter::default());
        let path = upload(&s, "board.kicad_pcb");

        let err = pipeline(&s, ParserBehaviour::NoInterpreter)
            .process(&path, &s.workspace)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind, FailureKind::ToolchainUnavailable);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let s = setup(CountingConverter::default());
        let path = upload(&s, "board.kicad_pcb");

        let err = pipeline(&s, ParserBehaviour::Panic)
            .process(&path, &s.workspace)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind, FailureKind::GenerationFailure);
    }
}
