//! Standalone Altium to KiCad conversion.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use ibom_core::error::AppError;
use plugin_altium_converter::{AltiumConverter, SourceConverter};

use crate::output::{self, OutputFormat};

/// Arguments for the convert command
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Altium `.PcbDoc` file to convert
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct ConvertReport {
    source: PathBuf,
    output: PathBuf,
    reused_cached: bool,
}

/// Execute the convert command
pub async fn execute(
    args: &ConvertArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let converter = AltiumConverter::new(config.converter);

    let converted = converter.convert(&args.file).await?;
    let report = ConvertReport {
        source: args.file.clone(),
        output: converted.path,
        reused_cached: converted.reused_cached,
    };

    match format {
        OutputFormat::Json => output::print_item(&report, format),
        OutputFormat::Table => {
            if report.reused_cached {
                output::print_success("Up-to-date conversion found, toolchain not run");
            } else {
                output::print_success("Converted");
            }
            output::print_kv("Source", &report.source.display().to_string());
            output::print_kv("Output", &report.output.display().to_string());
        }
    }
    Ok(())
}
