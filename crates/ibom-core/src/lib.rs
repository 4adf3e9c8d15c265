//! # ibom-core
//!
//! Core crate for the iBoM web service. Contains configuration schemas and
//! the unified error system shared by the converter, service, and API
//! crates.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::AppError;
pub use result::AppResult;
