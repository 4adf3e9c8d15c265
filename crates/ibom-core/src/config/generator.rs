//! HTML BOM generator configuration.

use serde::{Deserialize, Serialize};

/// Settings for the rendered artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Artifact file name pattern without extension. `%f` is the board stem.
    pub name_format: String,
    /// Page title prefix.
    pub title: String,
    /// Version string stamped into the board data as `ibom_version`.
    pub version: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name_format: "%f_iBoM".to_string(),
            title: "Interactive BOM".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Expand `name_format` for a board stem.
    pub fn artifact_name(&self, stem: &str) -> String {
        format!("{}.html", self.name_format.replace("%f", stem))
    }
}
