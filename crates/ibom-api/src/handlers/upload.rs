//! Board upload: store, process, report.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use ibom_core::AppError;
use tracing::{info, warn};

use crate::dto::response::{UploadFailure, UploadResponse};
use crate::error::ApiError;
use crate::extractors::Multipart;
use crate::state::AppState;

/// Form field carrying the board file.
pub const FILE_FIELD: &str = "file";
/// Optional form field naming the workspace base directory.
pub const TEMP_DIR_FIELD: &str = "temp_dir";

/// POST /upload
///
/// Transport problems are returned as errors. Pipeline failures are
/// reported in the body as `{success: false, error}` with a status code by
/// failure kind.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Multipart,
) -> Result<Response, ApiError> {
    let file = form
        .file(FILE_FIELD)
        .ok_or_else(|| AppError::malformed("No file uploaded"))?;
    if file.filename.trim().is_empty() {
        return Err(AppError::malformed("No file selected").into());
    }

    let workspace = state.workspaces.create(form.text(TEMP_DIR_FIELD)).await?;
    state.sessions.activate(workspace.clone()).await;
    let saved = state
        .workspaces
        .save_upload(&workspace, &file.filename, &file.data)
        .await?;
    info!(
        filename = %file.filename,
        size = file.len(),
        workspace = %workspace.root_path.display(),
        "Received upload"
    );

    match state.pipeline.process(&saved, &workspace).await {
        Ok(outcome) => {
            let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
            let url = artifact_url(
                host,
                &state.config.server.host,
                state.port,
                &outcome.artifact_name,
            );
            let file_path = outcome.artifact_path.display().to_string();
            Ok(Json(UploadResponse {
                success: true,
                filename: outcome.artifact_name,
                url,
                file_url: format!("file://{file_path}"),
                file_path,
                message: format!(
                    "Successfully generated BOM with {} components",
                    outcome.component_count
                ),
            })
            .into_response())
        }
        Err(err) => {
            warn!(kind = ?err.kind, error = %err.message, "Upload processing failed");
            let status = StatusCode::from_u16(err.kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Ok((
                status,
                Json(UploadFailure {
                    success: false,
                    error: err.message,
                }),
            )
                .into_response())
        }
    }
}

/// `http://<host>/generated/<name>`, with `port` appended when the host
/// carries none.
pub fn artifact_url(host: Option<&str>, fallback_host: &str, port: u16, name: &str) -> String {
    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(fallback_host);
    let authority = if has_port(host) {
        host.to_string()
    } else {
        format!("{host}:{port}")
    };
    format!("http://{authority}/generated/{}", encode_segment(name))
}

fn has_port(host: &str) -> bool {
    host.rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

/// Percent-encode a single path segment.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
