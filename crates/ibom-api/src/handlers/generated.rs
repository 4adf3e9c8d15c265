//! Generated artifact download.

use std::path::Path;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::Response;
use ibom_core::AppError;
use ibom_service::sanitize_filename;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /generated/{name}
pub async fn serve_generated(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Result<Response, ApiError> {
    let name = sanitize_filename(&name)
        .ok_or_else(|| AppError::not_found(format!("File not found: {name}")))?;
    let path = state
        .sessions
        .resolve(&name)
        .await
        .ok_or_else(|| AppError::not_found(format!("File not found: {name}")))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found(format!("File not found: {name}")).into());
        }
        Err(e) => return Err(AppError::from(e).into()),
    };
    let len = file.metadata().await.map_err(AppError::from)?.len();
    debug!(path = %path.display(), size = len, "Serving artifact");

    Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&path))
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

/// Content type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "json" => "application/json",
        "js" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "txt" | "log" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
