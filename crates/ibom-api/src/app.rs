//! Server bootstrap: bind, announce, serve, and clean up on shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use ibom_core::{AppConfig, AppError};
use tracing::{debug, error, info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Delay before the browser is pointed at the UI.
const BROWSER_DELAY: Duration = Duration::from_secs(1);

/// Build the application router from state.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Run the HTTP server until Ctrl-C.
///
/// Port 0 binds a free port. The active workspace is deleted on shutdown.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read bound address: {e}")))?;

    let open_browser = config.server.open_browser;
    let state = AppState::from_config(config, local.port());
    let sessions = state.sessions.clone();

    let url = ui_url(local);
    info!(url = %url, "iBoM server listening");
    println!("iBoM server running at {url}");
    println!("Press Ctrl+C to stop");

    if open_browser {
        tokio::spawn(async move {
            tokio::time::sleep(BROWSER_DELAY).await;
            launch_browser(&url).await;
        });
    }

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    match sessions.cleanup_active().await {
        Ok(Some(workspace)) => {
            info!(root = %workspace.root_path.display(), "Removed workspace on shutdown");
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to remove workspace on shutdown"),
    }
    Ok(())
}

/// Browser-facing URL for a bound address.
fn ui_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() || addr.ip().is_loopback() {
        format!("http://localhost:{}/", addr.port())
    } else {
        format!("http://{addr}/")
    }
}

async fn launch_browser(url: &str) {
    let mut cmd = if cfg!(target_os = "macos") {
        tokio::process::Command::new("open")
    } else if cfg!(windows) {
        let mut c = tokio::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        tokio::process::Command::new("xdg-open")
    };
    cmd.arg(url)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    match cmd.status().await {
        Ok(status) if status.success() => debug!(url = %url, "Opened browser"),
        Ok(status) => debug!(url = %url, %status, "Browser launcher exited unsuccessfully"),
        Err(e) => debug!(url = %url, error = %e, "Could not launch browser"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
