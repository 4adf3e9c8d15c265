//! Route definitions for the iBoM HTTP service.
//!
//! The router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_size_bytes;
    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(page_routes())
        .merge(upload_routes())
        .merge(artifact_routes())
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

/// UI page and session status
fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index::index))
        .route("/index.html", get(handlers::index::index))
        .route("/status", get(handlers::status::status))
}

/// Upload processing and workspace cleanup
fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::upload::upload))
        .route("/cleanup", post(handlers::cleanup::cleanup))
}

/// Generated artifacts
fn artifact_routes() -> Router<AppState> {
    Router::new().route(
        "/generated/{name}",
        get(handlers::generated::serve_generated),
    )
}
