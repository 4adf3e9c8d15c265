//! Workspace cleanup.

use axum::Json;
use axum::extract::State;
use ibom_core::AppError;
use ibom_core::error::ErrorKind;

use crate::dto::response::CleanupResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /cleanup
///
/// Deletes the active workspace. Succeeds when there is none.
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>, ApiError> {
    state.sessions.cleanup_active().await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to clean up workspace: {e}"),
            e,
        )
    })?;
    Ok(Json(CleanupResponse { success: true }))
}
