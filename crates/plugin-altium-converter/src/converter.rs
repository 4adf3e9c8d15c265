//! Conversion orchestrator.
//!
//! Turns an Altium `.PcbDoc` into a KiCad `.kicad_pcb` by running the
//! altium2kicad scripts in an isolated scratch directory:
//!
//! 1. reuse a fresh converted board next to the source, if any
//! 2. probe the interpreter
//! 3. locate the toolchain
//! 4. copy the source into a scratch dir and run unpack, then convert
//! 5. copy the produced board next to the source
//!
//! Steps 1 to 3 never touch the filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ibom_core::config::ConverterConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::ConversionCache;
use crate::discovery::{Toolchain, ToolchainLocator};
use crate::error::ConversionError;
use crate::executor::{ExecutionParams, ExecutorError, ProcessRunner};
use crate::metrics::ConversionMetrics;

/// Name prefix of scratch directories.
pub const SCRATCH_PREFIX: &str = "altium2kicad_";

/// Extension of converted boards.
pub const OUTPUT_EXTENSION: &str = "kicad_pcb";

/// A board in the canonical format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedBoard {
    /// Path of the `.kicad_pcb` file.
    pub path: PathBuf,
    /// Whether a previous conversion was reused.
    pub reused_cached: bool,
}

/// Converts a source design into a board the parser understands.
#[async_trait]
pub trait SourceConverter: Send + Sync {
    /// Convert `source`, returning the path of the converted board.
    async fn convert(&self, source: &Path) -> Result<ConvertedBoard, ConversionError>;
}

/// altium2kicad-backed converter.
#[derive(Debug)]
pub struct AltiumConverter {
    config: ConverterConfig,
    locator: ToolchainLocator,
    cache: ConversionCache,
    runner: ProcessRunner,
    metrics: Arc<ConversionMetrics>,
    scratch_root: PathBuf,
}

impl AltiumConverter {
    /// Create a converter from configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            locator: ToolchainLocator::from_config(&config),
            cache: ConversionCache::new(OUTPUT_EXTENSION),
            runner: ProcessRunner::new(config.max_diagnostic_chars),
            metrics: Arc::new(ConversionMetrics::new()),
            scratch_root: std::env::temp_dir(),
            config,
        }
    }

    /// Replace the toolchain locator.
    pub fn with_locator(mut self, locator: ToolchainLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Create scratch directories under `root` instead of the temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Shared metrics handle.
    pub fn metrics(&self) -> Arc<ConversionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Check that the interpreter runs, returning the first line it printed.
    pub async fn probe_interpreter(&self) -> Result<String, ConversionError> {
        let params = ExecutionParams::new(
            &self.config.interpreter,
            Duration::from_secs(self.config.probe_timeout_seconds),
        )
        .args(&self.config.probe_args);

        match self.runner.run(&params).await {
            Ok(output) => {
                let banner = output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or_default()
                    .to_string();
                debug!(interpreter = %self.config.interpreter, banner = %banner, "Interpreter available");
                Ok(banner)
            }
            Err(e) => Err(ConversionError::InterpreterUnavailable {
                interpreter: self.config.interpreter.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Locate the toolchain for `source` without running anything.
    pub fn locate(&self, source: &Path) -> Result<Toolchain, ConversionError> {
        self.locator.locate(source)
    }

    async fn convert_inner(&self, source: &Path) -> Result<ConvertedBoard, ConversionError> {
        let source = &std::path::absolute(source)?;
        let is_file = tokio::fs::metadata(source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ConversionError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        match self.cache.lookup(source).await {
            Ok(Some(entry)) => {
                info!(output = %entry.output.display(), "Reusing converted board");
                self.metrics.record_cache_hit();
                return Ok(ConvertedBoard {
                    path: entry.output,
                    reused_cached: true,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Cache lookup failed, converting again"),
        }

        if !self.config.enabled {
            return Err(ConversionError::Disabled);
        }

        self.probe_interpreter().await?;
        let toolchain = self.locate(source)?;

        let destination =
            self.cache
                .output_path_for(source)
                .ok_or_else(|| ConversionError::SourceMissing {
                    path: source.to_path_buf(),
                })?;

        let start = Instant::now();
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)?;
        debug!(scratch = %scratch.path().display(), "Created scratch directory");

        let outcome = self
            .run_toolchain(&toolchain, source, scratch.path(), &destination)
            .await;

        if let Err(e) = scratch.close() {
            warn!(error = %e, "Failed to remove scratch directory");
        }

        outcome?;
        self.metrics.record_success(start.elapsed());
        info!(
            output = %destination.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Conversion completed"
        );

        Ok(ConvertedBoard {
            path: destination,
            reused_cached: false,
        })
    }

    async fn run_toolchain(
        &self,
        toolchain: &Toolchain,
        source: &Path,
        scratch: &Path,
        destination: &Path,
    ) -> Result<(), ConversionError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| ConversionError::SourceMissing {
                path: source.to_path_buf(),
            })?;
        tokio::fs::copy(source, scratch.join(file_name)).await?;

        self.run_step(
            &toolchain.unpack_script,
            scratch,
            self.config.unpack_timeout_seconds,
        )
        .await?;
        self.run_step(
            &toolchain.entry_script,
            scratch,
            self.config.convert_timeout_seconds,
        )
        .await?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = collect_output(scratch, &stem).await?;
        tokio::fs::copy(&produced, destination).await?;
        Ok(())
    }

    async fn run_step(
        &self,
        script: &Path,
        scratch: &Path,
        timeout_seconds: u64,
    ) -> Result<(), ConversionError> {
        let step = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.display().to_string());

        info!(step = %step, "Running toolchain step");
        let params = ExecutionParams::new(
            &self.config.interpreter,
            Duration::from_secs(timeout_seconds),
        )
        .arg(script)
        .current_dir(scratch);

        match self.runner.run(&params).await {
            Ok(_) => Ok(()),
            Err(ExecutorError::Timeout { .. }) => Err(ConversionError::StepTimeout {
                step,
                timeout_seconds,
            }),
            Err(ExecutorError::ProcessFailed {
                code,
                stderr,
                stdout,
                ..
            }) => Err(ConversionError::StepFailed {
                step,
                code,
                stderr,
                stdout,
            }),
            Err(e @ ExecutorError::Spawn { .. }) => Err(ConversionError::StepFailed {
                step,
                code: -1,
                stderr: e.to_string(),
                stdout: String::new(),
            }),
        }
    }
}

#[async_trait]
impl SourceConverter for AltiumConverter {
    #[instrument(skip_all, fields(source = %source.display()))]
    async fn convert(&self, source: &Path) -> Result<ConvertedBoard, ConversionError> {
        self.metrics.record_started();
        let result = self.convert_inner(source).await;
        match &result {
            Err(ConversionError::StepTimeout { .. }) => self.metrics.record_timeout(),
            Err(e) => {
                warn!(error = %e, "Conversion failed");
                self.metrics.record_failure();
            }
            Ok(_) => {}
        }
        result
    }
}

/// Find the produced board: `<stem>.kicad_pcb`, else the first such file by
/// name.
async fn collect_output(scratch: &Path, stem: &str) -> Result<PathBuf, ConversionError> {
    let expected = scratch.join(format!("{stem}.{OUTPUT_EXTENSION}"));
    if tokio::fs::metadata(&expected).await.is_ok_and(|m| m.is_file()) {
        return Ok(expected);
    }

    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(scratch).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION));
        if matches && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }
    found.sort();

    found
        .into_iter()
        .next()
        .ok_or_else(|| ConversionError::OutputMissing {
            dir: scratch.to_path_buf(),
        })
}
