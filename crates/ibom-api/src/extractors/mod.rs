//! Custom Axum extractors.

pub mod form;

pub use form::Multipart;
