//! # ibom-api
//!
//! HTTP layer for the iBoM web service built on Axum.
//!
//! Serves the upload page, accepts board uploads through a buffered
//! multipart decoder, hands them to the processing pipeline, and streams
//! generated artifacts back.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod multipart;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
