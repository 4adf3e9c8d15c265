//! altium2kicad toolchain discovery.
//!
//! Locates a directory holding the toolchain scripts by checking, in order:
//! 1. The bundled directory next to the running executable
//! 2. Entries of the executable search path that carry an `altium2kicad` launcher
//! 3. Conventional install locations plus configured extra paths
//! 4. The directory of the file being converted, and its `altium2kicad` subdirectory
//! 5. Up to three ancestors of that directory, directly and via `altium2kicad`
//!
//! A candidate is accepted only if it holds the entry-point script. The
//! search runs on every conversion attempt and is never cached.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ibom_core::config::ConverterConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConversionError;

/// Number of ancestor directories of the source checked last.
const ANCESTOR_DEPTH: usize = 3;

/// A located toolchain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolchain {
    /// Toolchain directory.
    pub dir: PathBuf,
    /// Full path of the entry-point script.
    pub entry_script: PathBuf,
    /// Full path of the unpack script.
    pub unpack_script: PathBuf,
    /// How the toolchain was found.
    pub method: DiscoveryMethod,
}

/// How the toolchain was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Bundled next to the executable.
    Bundled,
    /// Found via the executable search path.
    SystemPath,
    /// Found in a conventional or configured location.
    CommonPath,
    /// The source file's own directory.
    SourceDirectory,
    /// A directory above the source file.
    Ancestor,
}

/// Toolchain discovery engine.
#[derive(Debug, Clone)]
pub struct ToolchainLocator {
    dir_name: String,
    entry_script: String,
    unpack_script: String,
    bundled_root: Option<PathBuf>,
    search_path: Option<OsString>,
    common_paths: Vec<PathBuf>,
}

impl ToolchainLocator {
    /// Build a locator from configuration and the process environment.
    pub fn from_config(config: &ConverterConfig) -> Self {
        let mut common_paths = default_common_paths(&config.toolchain_dir_name);
        common_paths.extend(config.extra_search_paths.iter().cloned());

        Self {
            dir_name: config.toolchain_dir_name.clone(),
            entry_script: config.entry_script.clone(),
            unpack_script: config.unpack_script.clone(),
            bundled_root: config.effective_bundled_root(),
            search_path: std::env::var_os("PATH"),
            common_paths,
        }
    }

    /// Override the bundled root.
    pub fn with_bundled_root(mut self, root: Option<PathBuf>) -> Self {
        self.bundled_root = root;
        self
    }

    /// Override the executable search path.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Replace the conventional locations.
    pub fn with_common_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.common_paths = paths;
        self
    }

    /// All candidate directories for `source`, in search order, without
    /// duplicates.
    pub fn candidates(&self, source: &Path) -> Vec<(PathBuf, DiscoveryMethod)> {
        let mut out: Vec<(PathBuf, DiscoveryMethod)> = Vec::new();
        let mut push = |path: PathBuf, method: DiscoveryMethod| {
            if !out.iter().any(|(p, _)| *p == path) {
                out.push((path, method));
            }
        };

        if let Some(root) = &self.bundled_root {
            push(root.join(&self.dir_name), DiscoveryMethod::Bundled);
        }

        if let Some(search_path) = &self.search_path {
            for entry in std::env::split_paths(search_path) {
                if has_launcher(&entry, &self.dir_name) {
                    push(entry, DiscoveryMethod::SystemPath);
                }
            }
        }

        for path in &self.common_paths {
            push(path.clone(), DiscoveryMethod::CommonPath);
        }

        let source_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        push(source_dir.clone(), DiscoveryMethod::SourceDirectory);
        push(source_dir.join(&self.dir_name), DiscoveryMethod::SourceDirectory);

        for ancestor in source_dir.ancestors().skip(1).take(ANCESTOR_DEPTH) {
            push(ancestor.to_path_buf(), DiscoveryMethod::Ancestor);
            push(ancestor.join(&self.dir_name), DiscoveryMethod::Ancestor);
        }

        out
    }

    /// Locate the toolchain for converting `source`.
    ///
    /// Pure lookup: nothing is created on disk.
    pub fn locate(&self, source: &Path) -> Result<Toolchain, ConversionError> {
        let candidates = self.candidates(source);

        for (dir, method) in &candidates {
            let entry_script = dir.join(&self.entry_script);
            if !entry_script.is_file() {
                debug!(dir = %dir.display(), method = ?method, "No toolchain here");
                continue;
            }

            if !dir.join(&self.unpack_script).is_file() {
                return Err(ConversionError::ToolchainIncomplete {
                    dir: dir.clone(),
                    missing: self.unpack_script.clone(),
                });
            }

            // The scripts run inside the scratch dir.
            let dir = std::path::absolute(dir)?;
            info!(dir = %dir.display(), method = ?method, "Found altium2kicad toolchain");
            return Ok(Toolchain {
                entry_script: dir.join(&self.entry_script),
                unpack_script: dir.join(&self.unpack_script),
                dir,
                method: *method,
            });
        }

        Err(ConversionError::ToolchainNotFound {
            searched: candidates.into_iter().map(|(p, _)| p).collect(),
        })
    }
}

/// Conventional install locations.
pub fn default_common_paths(dir_name: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = home_dir() {
        paths.push(home.join(dir_name));
        paths.push(home.join("github").join(dir_name));
    }
    paths.push(PathBuf::from("/usr/local/share").join(dir_name));
    paths.push(PathBuf::from("/opt").join(dir_name));
    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Whether `dir` holds an executable launcher named `name`.
fn has_launcher(dir: &Path, name: &str) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(dir.join(name))
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        ["exe", "bat", "cmd"]
            .iter()
            .any(|ext| dir.join(format!("{name}.{ext}")).is_file())
            || dir.join(name).is_file()
    }
}
