//! Start the web server.

use clap::Args;

use ibom_core::error::AppError;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Do not open a browser once the server is up
    #[arg(long)]
    pub no_browser: bool,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, config_path: &str) -> Result<(), AppError> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if args.no_browser {
        config.server.open_browser = false;
    }

    ibom_api::run_server(config).await
}
