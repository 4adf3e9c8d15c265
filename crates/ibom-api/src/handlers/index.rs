//! Upload page.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use tracing::warn;

use crate::state::AppState;

/// Page served when no `server.index_path` is configured.
pub const DEFAULT_INDEX: &str = include_str!("../../assets/index.html");

/// GET / and GET /index.html
pub async fn index(State(state): State<AppState>) -> Response {
    if let Some(path) = &state.config.server.index_path {
        match tokio::fs::read_to_string(path).await {
            Ok(page) => return Html(page).into_response(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Configured index page unreadable, serving built-in page");
            }
        }
    }
    Html(DEFAULT_INDEX).into_response()
}
