//! Analysis dispatch against the resolved endpoint.
//!
//! Constructing a client resolves the endpoint, so configuration errors
//! surface before the first request. Each call then captures the current
//! binding once, and every attempt (retries included) goes to that same
//! snapshot. A call never resolves on its own: after `invalidate()` it fails
//! with [`DispatchError::NotBound`] until someone calls `resolve()` or
//! [`AnalysisClient::rebind`].
//!
//!
//! ```text
//! Idle -> Resolving -> Bound -> Sending -> Success
//!                        |         |  \-> RetryPending -> Sending
//!                        |         \-> Failed
//!                        \-- invalidate() --> Resolving
//! ```
//!
//! Responses are classified into the [`DispatchError`] taxonomy: transport
//! failures retry with backoff, wrong-backend responses become
//! [`DispatchError::EndpointMismatch`], other non-success statuses become
//! [`DispatchError::Remote`].

mod fingerprint;
mod transport;

pub use fingerprint::detect_mismatch;
pub use transport::{HttpTransport, Transport, WireRequest, WireResponse};

use crate::config::{InsightConfig, RetryConfig};
use crate::endpoint::{EndpointResolver, EndpointStatus, ResolvedEndpoint, SourceKind};
use crate::errors::DispatchError;
use crate::payload::{AnalysisEnvelope, AnalysisPayload, PayloadError};
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Opaque request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    body: Arc<[u8]>,
}

impl AnalysisRequest {
    pub fn from_bytes(body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        Self {
            body: Arc::from(body),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_bytes(value.to_string())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl TryFrom<&AnalysisPayload> for AnalysisRequest {
    type Error = PayloadError;

    fn try_from(payload: &AnalysisPayload) -> Result<Self, Self::Error> {
        Ok(Self::from_json(&payload.to_json()?))
    }
}

/// A successful analysis plus its transport envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub status: u16,
    #[serde(skip)]
    pub body: Vec<u8>,
    #[serde(serialize_with = "crate::endpoint::serialize_url")]
    pub endpoint: Url,
    pub provenance: SourceKind,
    pub epoch: u64,
    pub attempts: u32,
    /// Duration of the attempt that succeeded.
    pub latency: Duration,
    /// Wall time from first attempt to completion, backoff included.
    pub elapsed: Duration,
}

impl AnalysisResult {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn envelope(&self) -> Option<AnalysisEnvelope> {
        AnalysisEnvelope::parse(&self.body)
    }
}

/// Dispatches analysis requests through a [`Transport`].
pub struct AnalysisClient<T = HttpTransport> {
    resolver: Arc<EndpointResolver>,
    transport: T,
    retry: RetryConfig,
    request_path: String,
}

impl AnalysisClient<HttpTransport> {
    /// reqwest-backed client configured from `config`.
    ///
    /// Resolves before building the HTTP client, so a missing endpoint is
    /// reported as [`DispatchError::Configuration`].
    pub fn from_config(
        resolver: Arc<EndpointResolver>,
        config: &InsightConfig,
    ) -> Result<Self, DispatchError> {
        resolver.resolve()?;
        let transport = HttpTransport::new(&config.client).map_err(|err| {
            DispatchError::configuration(format!("failed to build HTTP client: {err}"))
        })?;
        Self::new(
            resolver,
            transport,
            config.retry.clone(),
            config.endpoint.request_path.clone(),
        )
    }
}

impl<T: Transport> AnalysisClient<T> {
    /// Bind a client to `resolver`, resolving it now if it is not bound yet.
    pub fn new(
        resolver: Arc<EndpointResolver>,
        transport: T,
        retry: RetryConfig,
        request_path: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        resolver.resolve()?;
        Ok(Self {
            resolver,
            transport,
            retry,
            request_path: request_path.into(),
        })
    }

    pub fn resolver(&self) -> &Arc<EndpointResolver> {
        &self.resolver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn status(&self) -> EndpointStatus {
        self.resolver.status()
    }

    /// Drop the current binding and resolve again.
    ///
    /// Calls already in flight finish against the epoch they captured.
    pub fn rebind(&self) -> Result<Arc<ResolvedEndpoint>, DispatchError> {
        self.resolver.invalidate();
        self.resolver.resolve()
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, DispatchError> {
        self.analyze_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`analyze`](Self::analyze), but stops as soon as `cancel` fires:
    /// the in-flight attempt is abandoned and no further retries run.
    ///
    /// Fails with [`DispatchError::NotBound`] while the binding is
    /// invalidated; no request is sent in that case.
    pub async fn analyze_with_cancel(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, DispatchError> {
        let endpoint = self.resolver.current().ok_or_else(|| DispatchError::NotBound {
            epoch: self.resolver.epoch(),
        })?;
        let span = tracing::info_span!(
            "analyze",
            epoch = endpoint.epoch,
            provenance = %endpoint.provenance,
            endpoint = %endpoint.url,
        );
        self.dispatch(endpoint, request, cancel)
            .instrument(span)
            .await
    }

    async fn dispatch(
        &self,
        endpoint: Arc<ResolvedEndpoint>,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, DispatchError> {
        let wire = WireRequest {
            url: endpoint.request_url(&self.request_path),
            content_type: JSON_CONTENT_TYPE,
            body: Arc::clone(&request.body),
        };
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled { attempts });
            }
            attempts += 1;
            tracing::debug!(attempt = attempts, url = %wire.url, "sending");

            let sent_at = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(attempt = attempts, "cancelled while sending");
                    return Err(DispatchError::Cancelled { attempts });
                }
                outcome = self.transport.post(wire.clone()) => outcome,
            };

            let failure = match outcome {
                Ok(response) => {
                    return self.classify(
                        response,
                        &endpoint,
                        attempts,
                        sent_at.elapsed(),
                        started.elapsed(),
                    );
                }
                Err(failure) => failure,
            };

            tracing::warn!(
                attempt = attempts,
                kind = %failure.kind,
                error = %failure.message,
                "transport failure"
            );

            if !self.retry.should_retry(attempts, started.elapsed()) {
                return Err(DispatchError::Transport {
                    endpoint: endpoint.url.to_string(),
                    attempts,
                    last: failure,
                });
            }

            let delay = self.retry.delay_for_attempt(attempts);
            tracing::debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "retry pending"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(attempt = attempts, "cancelled during backoff");
                    return Err(DispatchError::Cancelled { attempts });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn classify(
        &self,
        response: WireResponse,
        endpoint: &ResolvedEndpoint,
        attempts: u32,
        latency: Duration,
        elapsed: Duration,
    ) -> Result<AnalysisResult, DispatchError> {
        if !response.is_success() {
            tracing::warn!(status = response.status, attempt = attempts, "remote error");
            return Err(DispatchError::remote(
                response.status,
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }

        if let Some(reason) = detect_mismatch(&response) {
            tracing::error!(
                status = response.status,
                reason = %reason,
                "response came from the wrong backend"
            );
            return Err(DispatchError::EndpointMismatch {
                endpoint: endpoint.url.to_string(),
                epoch: endpoint.epoch,
                reason,
            });
        }

        tracing::info!(
            status = response.status,
            attempts,
            latency_ms = latency.as_millis() as u64,
            "analysis succeeded"
        );
        Ok(AnalysisResult {
            status: response.status,
            body: response.body,
            endpoint: endpoint.url.clone(),
            provenance: endpoint.provenance,
            epoch: endpoint.epoch,
            attempts,
            latency,
            elapsed,
        })
    }
}
