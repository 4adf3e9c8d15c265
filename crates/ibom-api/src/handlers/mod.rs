//! Route handlers.

pub mod cleanup;
pub mod generated;
pub mod index;
pub mod status;
pub mod upload;

use axum::http::Uri;
use ibom_core::AppError;

use crate::error::ApiError;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    AppError::not_found(format!("No route for {}", uri.path())).into()
}
