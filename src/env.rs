//! Environment-variable access for endpoint resolution.
//!
//! Resolution reads exactly one environment variable, but it reads it through
//! a trait so the rest of the crate never touches the process environment
//! directly:
//!
//! - **Dependency injection**: pass the capability explicitly rather than
//!   reading `std::env` from deep inside the resolver
//! - **Testability**: tests use [`MapEnv`] and never mutate process state
//!
//! # Usage
//!
//! ```rust
//! use insightlink::env::{EnvVars, MapEnv};
//!
//! let env = MapEnv::new().with_var("VITE_API_ENDPOINT", "https://api.example/");
//! assert_eq!(env.var("VITE_API_ENDPOINT").as_deref(), Some("https://api.example/"));
//! assert!(env.var("MISSING").is_none());
//! ```

use std::collections::HashMap;

/// Read-only view of environment variables.
///
/// Implementations must be `Send + Sync` so a resolver can be shared across
/// tasks.
pub trait EnvVars: Send + Sync {
    /// Look up a variable. Unset and non-UTF-8 values both read as `None`.
    fn var(&self, name: &str) -> Option<String>;
}

/// Production implementation backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvVars for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// In-memory environment for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable (builder style).
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl EnvVars for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}
