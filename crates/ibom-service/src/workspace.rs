//! Per-upload scratch workspaces.
//!
//! Each upload gets a fresh `<prefix><random>` directory with an output
//! subdirectory. Workspaces are never reused and are only removed by an
//! explicit cleanup.

use std::path::{Path, PathBuf};

use ibom_core::config::WorkspaceConfig;
use ibom_core::{AppError, AppResult};
use serde::Serialize;
use tracing::debug;

/// A scratch directory holding one upload and its generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    /// Workspace root; the upload is saved here.
    pub root_path: PathBuf,
    /// Output directory inside the root.
    pub output_path: PathBuf,
}

impl Workspace {
    /// Whether `path` lies inside this workspace.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root_path)
    }
}

/// Creates workspaces and stores uploads in them.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    config: WorkspaceConfig,
}

impl WorkspaceManager {
    /// Create a manager.
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    /// Workspace configuration.
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Resolve a client-supplied base directory to an absolute path.
    ///
    /// Relative paths are taken against the configured relative base.
    pub fn resolve_base(&self, requested: &str) -> AppResult<PathBuf> {
        let requested = Path::new(requested.trim());
        if requested.is_absolute() {
            Ok(requested.to_path_buf())
        } else {
            Ok(std::path::absolute(self.config.relative_base.join(requested))?)
        }
    }

    /// Create a fresh workspace under `base`, or under the configured base.
    ///
    /// The returned paths are always absolute.
    pub async fn create(&self, base: Option<&str>) -> AppResult<Workspace> {
        let parent = match base.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => self.resolve_base(b)?,
            None => std::path::absolute(self.config.base_dir())?,
        };
        tokio::fs::create_dir_all(&parent).await.map_err(|e| {
            AppError::with_source(
                ibom_core::error::ErrorKind::Storage,
                format!("Cannot create workspace base {}", parent.display()),
                e,
            )
        })?;

        let root_path = tempfile::Builder::new()
            .prefix(&self.config.prefix)
            .tempdir_in(&parent)?
            .keep();
        let output_path = root_path.join(&self.config.output_subdir);
        tokio::fs::create_dir_all(&output_path).await?;

        debug!(root = %root_path.display(), "Created workspace");
        Ok(Workspace {
            root_path,
            output_path,
        })
    }

    /// Save uploaded bytes into the workspace root under the sanitized name.
    pub async fn save_upload(
        &self,
        workspace: &Workspace,
        filename: &str,
        bytes: &[u8],
    ) -> AppResult<PathBuf> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| AppError::malformed(format!("Invalid file name: {filename}")))?;
        let path = workspace.root_path.join(name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Saved upload");
        Ok(path)
    }
}

/// Reduce a client-supplied name to its final path component.
///
/// Both `/` and `\` count as separators. Returns `None` for names that
/// would not name a file.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}
