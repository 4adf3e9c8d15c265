//! CLI command definitions and dispatch.

pub mod config;
pub mod convert;
pub mod doctor;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use ibom_core::config::AppConfig;
use ibom_core::error::AppError;

/// iBoM: interactive BOM generation for KiCad and Altium boards
#[derive(Debug, Parser)]
#[command(name = "ibom", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve(serve::ServeArgs),
    /// Convert an Altium board to KiCad without the server
    Convert(convert::ConvertArgs),
    /// Check the external tools the service depends on
    Doctor(doctor::DoctorArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Serve(args) => serve::execute(args, &self.config).await,
            Commands::Convert(args) => convert::execute(args, &self.config, self.format).await,
            Commands::Doctor(args) => doctor::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}
