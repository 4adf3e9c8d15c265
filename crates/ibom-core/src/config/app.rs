//! Server and CORS configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port. `0` binds a free ephemeral port.
    #[serde(default)]
    pub port: u16,
    /// Open the UI in the platform browser once the listener is bound.
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
    /// Maximum accepted request body size for uploads.
    #[serde(default = "default_max_upload")]
    #[validate(range(min = 1024))]
    pub max_upload_size_bytes: usize,
    /// Optional UI page served at `/`; the embedded page is used otherwise.
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            open_browser: default_open_browser(),
            max_upload_size_bytes: default_max_upload(),
            index_path: None,
            cors: CorsConfig::default(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (`["*"]` allows any).
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods.
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    /// Max age for preflight cache in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            max_age_seconds: default_max_age(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_open_browser() -> bool {
    true
}

fn default_max_upload() -> usize {
    100 * 1024 * 1024
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allowed_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

fn default_max_age() -> u64 {
    3600
}
