//! Environment diagnostics for the external tools.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use ibom_core::error::AppError;
use ibom_service::backend::python::PythonDiscovery;
use plugin_altium_converter::AltiumConverter;

use crate::output::{self, OutputFormat};

/// Arguments for the doctor command
#[derive(Debug, Args)]
pub struct DoctorArgs {
    /// Board whose directory is included in the toolchain search
    #[arg(long)]
    pub board: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Missing,
    Disabled,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Missing => write!(f, "missing"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct Check {
    check: String,
    status: CheckStatus,
    detail: String,
}

impl Check {
    fn new(check: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

/// Execute the doctor command
pub async fn execute(
    args: &DoctorArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let mut checks = Vec::new();

    if config.converter.enabled {
        let converter = AltiumConverter::new(config.converter.clone());
        checks.push(match converter.probe_interpreter().await {
            Ok(banner) => Check::new("converter interpreter", CheckStatus::Ok, banner),
            Err(e) => Check::new("converter interpreter", CheckStatus::Missing, e.to_string()),
        });

        let board = match &args.board {
            Some(board) => board.clone(),
            None => std::env::current_dir()?.join("board.PcbDoc"),
        };
        checks.push(match converter.locate(&board) {
            Ok(toolchain) => Check::new(
                "altium2kicad toolchain",
                CheckStatus::Ok,
                format!("{} ({:?})", toolchain.dir.display(), toolchain.method),
            ),
            Err(e) => Check::new("altium2kicad toolchain", CheckStatus::Missing, e.to_string()),
        });
    } else {
        checks.push(Check::new(
            "altium2kicad toolchain",
            CheckStatus::Disabled,
            "converter.enabled = false",
        ));
    }

    checks.push(
        match PythonDiscovery::new().discover(config.parser.python.as_deref()) {
            Some(python) => Check::new(
                "parser interpreter",
                CheckStatus::Ok,
                format!("{} ({:?})", python.path.display(), python.source),
            ),
            None => Check::new(
                "parser interpreter",
                CheckStatus::Missing,
                "no KiCad Python or python3 found; set parser.python",
            ),
        },
    );

    let script = &config.parser.script;
    checks.push(if script.is_file() {
        Check::new("board dump script", CheckStatus::Ok, script.display().to_string())
    } else {
        Check::new(
            "board dump script",
            CheckStatus::Missing,
            format!("{} not found", script.display()),
        )
    });

    let base = config.workspace.base_dir();
    checks.push(if base.is_dir() {
        Check::new("workspace base", CheckStatus::Ok, base.display().to_string())
    } else {
        Check::new(
            "workspace base",
            CheckStatus::Missing,
            format!("{} does not exist yet; it is created on first upload", base.display()),
        )
    });

    output::print_list(&checks, format);

    let missing = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Missing)
        .count();
    if format == OutputFormat::Table {
        if missing == 0 {
            output::print_success("All checks passed");
        } else {
            output::print_warning(&format!("{missing} check(s) need attention"));
        }
    }
    Ok(())
}
