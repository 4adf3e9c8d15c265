//! Session status.

use axum::Json;
use axum::extract::State;

use crate::dto::response::StatusResponse;
use crate::state::AppState;

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let active = state.sessions.active().await;
    Json(StatusResponse {
        temp_dir: active
            .as_ref()
            .map(|w| w.root_path.display().to_string()),
        output_dir: active
            .as_ref()
            .map(|w| w.output_path.display().to_string()),
        ready: true,
        conversions: state.conversion_metrics.snapshot(),
    })
}
