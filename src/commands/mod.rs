//! CLI command implementations.
//!
//! Available commands:
//! - **status**: resolve the endpoint and show its provenance
//! - **analyze**: send one analysis request and print the outcome
//! - **init**: write a default `.insightlink.toml`
//!
//! Dispatch failures are rendered here and turned into process exit codes so
//! scripts can tell a misconfiguration from an outage.

pub mod analyze;
pub mod init;
pub mod status;

pub use analyze::{apply_overrides, build_request, handle_analyze};
pub use init::init_config;
pub use status::handle_status;

use crate::config::{load_config, load_config_from_path, InsightConfig};
use crate::errors::DispatchError;
use anyhow::{Context, Result};
use std::path::Path;

/// Exit codes by failure kind. 1 and 2 stay with anyhow and clap.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const CONFIGURATION: u8 = 3;
    pub const ENDPOINT_MISMATCH: u8 = 4;
    pub const TRANSPORT: u8 = 5;
    pub const REMOTE: u8 = 6;
    pub const CANCELLED: u8 = 130;
}

pub fn exit_code_for(error: &DispatchError) -> u8 {
    match error {
        DispatchError::Configuration { .. } | DispatchError::NotBound { .. } => {
            exit::CONFIGURATION
        }
        DispatchError::EndpointMismatch { .. } => exit::ENDPOINT_MISMATCH,
        DispatchError::Transport { .. } => exit::TRANSPORT,
        DispatchError::Remote { .. } => exit::REMOTE,
        DispatchError::Cancelled { .. } => exit::CANCELLED,
    }
}

/// Load an explicit config file, or discover one from the working directory.
pub fn resolve_config(explicit: Option<&Path>) -> Result<InsightConfig> {
    match explicit {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            load_config(&cwd).context("Failed to load configuration")
        }
    }
}
