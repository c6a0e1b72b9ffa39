//! Configuration for endpoint resolution and dispatch.
//!
//! Settings live in `.insightlink.toml`, discovered by walking up from the
//! current directory. Every field has a serde default, so an empty file (or
//! no file at all) yields a working configuration.
//!
//! ```toml
//! [endpoint]
//! env_var = "VITE_API_ENDPOINT"
//! default_origin = "https://analysis.example.com"
//! deprecated_path_suffixes = ["/api/analysis"]
//! request_path = "/analysis"
//!
//! [retry]
//! max_retries = 4
//!
//! [client]
//! request_timeout_seconds = 120
//! ```

mod loader;
pub mod retry;

pub use loader::{
    directory_ancestors, load_config, load_config_from_path, parse_config, validate_config,
    CONFIG_FILE_NAME,
};
pub use retry::{RetryConfig, RetryStrategy};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the environment variable consulted by default.
pub const DEFAULT_ENV_VAR: &str = "VITE_API_ENDPOINT";

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// Where the endpoint comes from and how it is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Environment variable holding the endpoint (default: `VITE_API_ENDPOINT`)
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Shipped default origin; takes the place of the build-time value
    #[serde(default)]
    pub default_origin: Option<String>,

    /// Path suffixes that mark an obsolete API route
    #[serde(default = "default_deprecated_suffixes")]
    pub deprecated_path_suffixes: Vec<String>,

    /// Path appended to the base URL for analysis requests
    #[serde(default = "default_request_path")]
    pub request_path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            default_origin: None,
            deprecated_path_suffixes: default_deprecated_suffixes(),
            request_path: default_request_path(),
        }
    }
}

/// HTTP client tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Whole-request timeout; reasoning models are slow (default: 120)
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn default_env_var() -> String {
    DEFAULT_ENV_VAR.to_string()
}

fn default_deprecated_suffixes() -> Vec<String> {
    vec!["/api/analysis".to_string()]
}

fn default_request_path() -> String {
    "/analysis".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    120
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("insightlink/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Commented starter file written by `insightlink init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# insightlink configuration

[endpoint]
# Environment variable consulted after an explicit --endpoint override.
env_var = "VITE_API_ENDPOINT"
# Fallback origin used when neither an override nor the variable is set.
# default_origin = "https://analysis.example.com"
# Routes that only ever reach an obsolete backend.
deprecated_path_suffixes = ["/api/analysis"]
request_path = "/analysis"

[retry]
enabled = true
max_retries = 4
base_delay_ms = 250
strategy = "exponential"
timeout_seconds = 60

[client]
request_timeout_seconds = 120
connect_timeout_seconds = 10
"#;
