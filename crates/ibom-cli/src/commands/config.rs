//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use ibom_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{config_path}' is valid"));
                output::print_kv(
                    "Server",
                    &format!("{}:{}", config.server.host, config.server.port),
                );
                output::print_kv(
                    "Workspace base",
                    &config.workspace.base_dir().display().to_string(),
                );
                output::print_kv("Converter interpreter", &config.converter.interpreter);
                output::print_kv("Parser script", &config.parser.script.display().to_string());
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(out_path, default_config).await?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }
    Ok(())
}
