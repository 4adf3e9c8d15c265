//! Discovery of a Python interpreter able to run the board-dump script.
//!
//! Searches in order:
//! 1. The explicitly configured interpreter
//! 2. KiCad-bundled Python in conventional per-platform install locations
//! 3. `python3` (or `python` on Windows) on the executable search path

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

/// How an interpreter was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PythonSource {
    /// Set in configuration.
    Configured,
    /// A KiCad installation.
    KicadInstall,
    /// The executable search path.
    SystemPath,
}

/// A usable interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonInterpreter {
    /// Interpreter path or command.
    pub path: PathBuf,
    /// How it was found.
    pub source: PythonSource,
}

/// Interpreter discovery engine.
#[derive(Debug, Clone)]
pub struct PythonDiscovery {
    kicad_candidates: Vec<PathBuf>,
    search_path: Option<OsString>,
}

impl PythonDiscovery {
    /// Discovery over the platform's KiCad locations and `PATH`.
    pub fn new() -> Self {
        Self {
            kicad_candidates: kicad_candidates(),
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Replace the KiCad candidate list.
    pub fn with_kicad_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.kicad_candidates = candidates;
        self
    }

    /// Replace the executable search path.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Find an interpreter, preferring `configured`.
    pub fn discover(&self, configured: Option<&Path>) -> Option<PythonInterpreter> {
        if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
            debug!(path = %path.display(), "Using configured Python");
            return Some(PythonInterpreter {
                path: path.to_path_buf(),
                source: PythonSource::Configured,
            });
        }

        if let Some(path) = self.kicad_candidates.iter().find(|p| p.is_file()) {
            info!(path = %path.display(), "Found KiCad Python");
            return Some(PythonInterpreter {
                path: path.clone(),
                source: PythonSource::KicadInstall,
            });
        }

        let name = if cfg!(windows) { "python.exe" } else { "python3" };
        let found = self
            .search_path
            .as_ref()
            .and_then(|sp| std::env::split_paths(sp).map(|d| d.join(name)).find(|p| p.is_file()));

        match found {
            Some(path) => {
                info!(path = %path.display(), "Using Python from PATH");
                Some(PythonInterpreter {
                    path,
                    source: PythonSource::SystemPath,
                })
            }
            None => {
                debug!("No Python interpreter found");
                None
            }
        }
    }
}

impl Default for PythonDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Conventional KiCad Python locations for this platform, in preference
/// order.
pub fn kicad_candidates() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let framework = "/Applications/KiCad/KiCad.app/Contents/Frameworks/Python.framework/Versions";
        ["Current", "3.11", "3.10", "3.9"]
            .iter()
            .map(|v| PathBuf::from(format!("{framework}/{v}/bin/python3")))
            .collect()
    }
    #[cfg(windows)]
    {
        let mut out = Vec::new();
        for pf in [r"C:\Program Files", r"C:\Program Files (x86)"] {
            let pf = Path::new(pf);
            let mut versions = versioned_dirs(&pf.join("KiCad"));
            versions.sort_by(|a, b| b.0.cmp(&a.0));
            out.extend(versions.into_iter().map(|(_, d)| d.join("bin").join("python.exe")));
            out.push(pf.join("KiCad").join("bin").join("python.exe"));

            let mut named: Vec<PathBuf> = std::fs::read_dir(pf)
                .map(|rd| {
                    rd.filter_map(Result::ok)
                        .filter(|e| e.file_name().to_string_lossy().starts_with("KiCad"))
                        .map(|e| e.path().join("bin").join("python.exe"))
                        .collect()
                })
                .unwrap_or_default();
            named.sort_by(|a, b| b.cmp(a));
            out.extend(named);
        }
        out
    }
    #[cfg(not(any(target_os = "macos", windows)))]
    {
        [
            "/usr/bin/kicad-python3",
            "/usr/local/bin/kicad-python3",
            "/usr/lib/kicad/bin/python3",
            "/usr/local/lib/kicad/bin/python3",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

/// Subdirectories of `dir` whose names parse as dotted version numbers.
#[cfg_attr(not(windows), allow(dead_code))]
fn versioned_dirs(dir: &Path) -> Vec<(Vec<u32>, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|e| {
            let version = parse_version(&e.file_name().to_string_lossy())?;
            Some((version, e.path()))
        })
        .collect()
}

fn parse_version(name: &str) -> Option<Vec<u32>> {
    name.split('.').map(|p| p.parse().ok()).collect()
}
