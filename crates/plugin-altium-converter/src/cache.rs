//! Conversion output reuse.
//!
//! A converted board is written next to its source as `<stem>.kicad_pcb`.
//! It is reused when its modification time is not older than the source's.
//! Identity is the path plus mtime only; a source replaced by an older copy
//! keeps hitting the newer converted file.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A fresh cached conversion.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The converted board.
    pub output: PathBuf,
    /// Modification time of the converted board.
    pub output_modified: SystemTime,
    /// Modification time of the source when checked.
    pub source_modified: SystemTime,
}

/// Lookup of previously converted boards.
#[derive(Debug, Clone)]
pub struct ConversionCache {
    extension: String,
}

impl ConversionCache {
    /// Create a cache for outputs with the given extension (without dot).
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Where the converted form of `source` lives.
    pub fn output_path_for(&self, source: &Path) -> Option<PathBuf> {
        let stem = source.file_stem()?;
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(&self.extension);
        Some(dir.join(name))
    }

    /// Return the cached output for `source` if it exists and is fresh.
    pub async fn lookup(&self, source: &Path) -> std::io::Result<Option<CacheEntry>> {
        let Some(output) = self.output_path_for(source) else {
            return Ok(None);
        };

        let output_meta = match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let source_modified = tokio::fs::metadata(source).await?.modified()?;
        let output_modified = output_meta.modified()?;

        if output_modified >= source_modified {
            tracing::debug!(output = %output.display(), "Cached conversion is fresh");
            Ok(Some(CacheEntry {
                output,
                output_modified,
                source_modified,
            }))
        } else {
            tracing::debug!(output = %output.display(), "Cached conversion is stale");
            Ok(None)
        }
    }
}

impl Default for ConversionCache {
    fn default() -> Self {
        Self::new("kicad_pcb")
    }
}
