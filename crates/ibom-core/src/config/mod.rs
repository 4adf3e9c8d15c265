//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every section has defaults so the server starts without
//! any file at all.

pub mod app;
pub mod converter;
pub mod generator;
pub mod logging;
pub mod parser;
pub mod workspace;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::app::{CorsConfig, ServerConfig};
pub use self::converter::ConverterConfig;
pub use self::generator::GeneratorConfig;
pub use self::logging::LoggingConfig;
pub use self::parser::ParserConfig;
pub use self::workspace::WorkspaceConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "IBOM";

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (base file + optional environment overlay + `IBOM__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    #[validate(nested)]
    pub server: ServerConfig,
    /// Per-upload workspace settings.
    #[validate(nested)]
    pub workspace: WorkspaceConfig,
    /// Altium-to-KiCad converter settings.
    #[validate(nested)]
    pub converter: ConverterConfig,
    /// Board parser collaborator settings.
    #[validate(nested)]
    pub parser: ParserConfig,
    /// HTML BOM generator settings.
    pub generator: GeneratorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. If `IBOM_ENV` is set, `config/<env>.toml` is
    /// layered on top, followed by environment variables such as
    /// `IBOM__SERVER__PORT=9000`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let mut builder = config::Config::builder()
            .add_source(config::File::from(path).required(false));

        if let Ok(env) = std::env::var(format!("{ENV_PREFIX}_ENV")) {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let mut app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        app.resolve_paths()?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(app)
    }

    /// Make every filesystem path absolute against the current directory.
    ///
    /// Child processes run in their own working directory; paths handed to
    /// them must not depend on it.
    pub fn resolve_paths(&mut self) -> Result<(), AppError> {
        let parser = &mut self.parser;
        absolutize(&mut parser.script)?;
        if let Some(python) = parser.python.as_mut().filter(|p| p.components().count() > 1) {
            absolutize(python)?;
        }

        let workspace = &mut self.workspace;
        absolutize(&mut workspace.relative_base)?;
        for dir in [workspace.base_dir.as_mut(), workspace.scan_root.as_mut()]
            .into_iter()
            .flatten()
        {
            absolutize(dir)?;
        }

        let converter = &mut self.converter;
        if let Some(root) = converter.bundled_root.as_mut() {
            absolutize(root)?;
        }
        for dir in &mut converter.extra_search_paths {
            absolutize(dir)?;
        }
        Ok(())
    }
}

fn absolutize(path: &mut PathBuf) -> Result<(), AppError> {
    if !path.is_absolute() && !path.as_os_str().is_empty() {
        *path = std::path::absolute(&*path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.converter.interpreter, "perl");
        assert_eq!(config.workspace.prefix, "bom_");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/ibom-config.toml").expect("load");
        assert_eq!(config.converter.unpack_timeout_seconds, 60);
        assert_eq!(config.converter.convert_timeout_seconds, 120);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = std::env::temp_dir().join(format!("ibom-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let file = dir.join("partial.toml");
        std::fs::write(
            &file,
            "[server]\nport = 9123\n\n[workspace]\nscan_limit = 12\n",
        )
        .expect("write");

        let config = AppConfig::load(&file).expect("load");
        assert_eq!(config.server.port, 9123);
        assert_eq!(config.workspace.scan_limit, 12);
        assert_eq!(config.workspace.output_subdir, "output");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let mut config = AppConfig::default();
        config.converter.convert_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let mut config = AppConfig::default();
        config.converter.extra_search_paths = vec![PathBuf::from("tools")];
        config.parser.python = Some(PathBuf::from("venv/bin/python3"));
        config.resolve_paths().expect("resolve");

        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(config.parser.script, cwd.join("scripts/dump_board.py"));
        assert_eq!(config.parser.python, Some(cwd.join("venv/bin/python3")));
        assert!(config.workspace.relative_base.is_absolute());
        assert!(config.workspace.relative_base.starts_with(&cwd));
        assert_eq!(config.converter.extra_search_paths, vec![cwd.join("tools")]);
    }

    #[test]
    fn test_bare_interpreter_name_is_kept() {
        let mut config = AppConfig::default();
        config.parser.python = Some(PathBuf::from("python3"));
        config.resolve_paths().expect("resolve");
        assert_eq!(config.parser.python, Some(PathBuf::from("python3")));
    }

    #[test]
    fn test_load_resolves_paths() {
        let config = AppConfig::load("/nonexistent/ibom-config.toml").expect("load");
        assert!(config.parser.script.is_absolute());
        assert!(config.workspace.relative_base.is_absolute());
    }

    #[test]
    fn test_toml_section_roundtrip() {
        let toml_str = "[converter]\ninterpreter = \"/usr/bin/perl\"\n";
        let config: AppConfig = toml::from_str(toml_str).expect("parse toml");
        assert_eq!(config.converter.interpreter, "/usr/bin/perl");
        assert_eq!(config.converter.entry_script, "convertpcb.pl");
    }
}
