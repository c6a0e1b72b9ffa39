//! Endpoint resolution and request dispatch for a remote analysis API.
//!
//! [`EndpointResolver`] picks one backend origin from an ordered set of
//! candidate sources, validates it, and records where it came from.
//! [`AnalysisClient`] sends every attempt of a call (retries included) to that
//! single binding and classifies failures into [`DispatchError`].
//!
//! ```no_run
//! use insightlink::{AnalysisClient, AnalysisRequest, EndpointResolver, InsightConfig, ProcessEnv};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = InsightConfig::default();
//! let resolver = Arc::new(EndpointResolver::from_config(None, &ProcessEnv, &config.endpoint));
//! let client = AnalysisClient::from_config(resolver, &config)?;
//! let result = client
//!     .analyze(&AnalysisRequest::from_bytes(r#"{"csv":"a,b\n1,2"}"#))
//!     .await?;
//! println!("{} via {}", result.endpoint, result.provenance);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod endpoint;
pub mod env;
pub mod errors;
pub mod observability;
pub mod payload;
pub mod testkit;

pub use crate::client::{
    AnalysisClient, AnalysisRequest, AnalysisResult, HttpTransport, Transport, WireRequest,
    WireResponse,
};
pub use crate::config::{load_config, InsightConfig, RetryConfig};
pub use crate::endpoint::{
    EndpointResolver, EndpointSource, EndpointStatus, ResolvedEndpoint, SourceKind, UrlRules,
};
pub use crate::env::{EnvVars, MapEnv, ProcessEnv};
pub use crate::errors::{DispatchError, ErrorCode, TransportErrorKind, TransportFailure};
pub use crate::payload::{AnalysisEnvelope, AnalysisPayload, AnalysisType, ResponseFormat};
