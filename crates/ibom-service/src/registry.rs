//! Artifact registry and the active upload session.
//!
//! Maps generated artifact names to the directory holding them, and tracks
//! the workspace of the most recent upload. One lock guards both so cleanup
//! and registration never interleave.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ibom_core::config::WorkspaceConfig;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::workspace::Workspace;

#[derive(Debug, Default)]
struct SessionState {
    artifacts: HashMap<String, PathBuf>,
    active: Option<Workspace>,
    /// Names dropped by cleanup; the scan fallback skips them.
    retired: HashSet<String>,
}

/// Registry of generated artifacts for the server's lifetime.
#[derive(Debug)]
pub struct SessionStore {
    state: RwLock<SessionState>,
    prefix: String,
    output_subdir: String,
    scan_root: PathBuf,
    scan_limit: usize,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            prefix: config.prefix.clone(),
            output_subdir: config.output_subdir.clone(),
            scan_root: config.scan_root(),
            scan_limit: config.scan_limit,
        }
    }

    /// Record that artifact `name` lives in `dir`.
    pub async fn register(&self, name: impl Into<String>, dir: impl Into<PathBuf>) {
        let name = name.into();
        let dir = dir.into();
        debug!(name = %name, dir = %dir.display(), "Registered artifact");
        let mut state = self.state.write().await;
        state.retired.remove(&name);
        state.artifacts.insert(name, dir);
    }

    /// Resolve an artifact name to the full path of an existing file.
    ///
    /// Checks the registry, then the active workspace, then scans the scan
    /// root for workspaces holding the file. A scan hit is registered.
    /// Names removed by [`cleanup_active`](Self::cleanup_active) are not
    /// scanned for until registered again.
    pub async fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }

        {
            let state = self.state.read().await;
            if let Some(dir) = state.artifacts.get(name) {
                let path = dir.join(name);
                if is_file(&path).await {
                    return Some(path);
                }
            }
            if let Some(active) = &state.active {
                let path = active.output_path.join(name);
                if is_file(&path).await {
                    return Some(path);
                }
            }
            if state.retired.contains(name) {
                return None;
            }
        }

        let dir = self.scan(name).await?;
        let path = dir.join(name);
        self.register(name, dir).await;
        Some(path)
    }

    /// Look through workspace directories under the scan root.
    async fn scan(&self, name: &str) -> Option<PathBuf> {
        let mut entries = tokio::fs::read_dir(&self.scan_root).await.ok()?;
        let mut inspected = 0usize;

        while inspected < self.scan_limit {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) | Err(_) => break,
            };
            let matches_prefix = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&self.prefix));
            if !matches_prefix {
                continue;
            }
            if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                continue;
            }

            inspected += 1;
            let output = entry.path().join(&self.output_subdir);
            if is_file(&output.join(name)).await {
                debug!(name = %name, dir = %output.display(), inspected, "Found artifact by scan");
                return Some(output);
            }
        }

        None
    }

    /// Make `workspace` the active session.
    pub async fn activate(&self, workspace: Workspace) {
        self.state.write().await.active = Some(workspace);
    }

    /// The active session's workspace, if any.
    pub async fn active(&self) -> Option<Workspace> {
        self.state.read().await.active.clone()
    }

    /// Delete the active workspace from disk and forget it.
    ///
    /// Registry entries pointing into the workspace are dropped. On I/O
    /// failure the session stays active.
    pub async fn cleanup_active(&self) -> std::io::Result<Option<Workspace>> {
        let mut state = self.state.write().await;
        let Some(active) = state.active.clone() else {
            return Ok(None);
        };

        match tokio::fs::remove_dir_all(&active.root_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        state.active = None;
        let dropped: Vec<String> = state
            .artifacts
            .iter()
            .filter(|(_, dir)| active.contains(dir))
            .map(|(name, _)| name.clone())
            .collect();
        for name in dropped {
            state.artifacts.remove(&name);
            state.retired.insert(name);
        }
        info!(root = %active.root_path.display(), "Cleaned up workspace");
        Ok(Some(active))
    }

    /// Number of registered artifacts.
    pub async fn len(&self) -> usize {
        self.state.read().await.artifacts.len()
    }

    /// Whether no artifact is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}
