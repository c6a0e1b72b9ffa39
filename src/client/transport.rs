//! The HTTP seam between the dispatch loop and the network.
//!
//! [`AnalysisClient`](super::AnalysisClient) only needs "POST these bytes to
//! this URL", so the seam is one method. Production uses [`HttpTransport`]
//! (reqwest); tests use [`ScriptedTransport`](crate::testkit::ScriptedTransport).

use crate::config::ClientConfig;
use crate::errors::{TransportErrorKind, TransportFailure};
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

/// One outgoing POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub url: String,
    pub content_type: &'static str,
    pub body: Arc<[u8]>,
}

/// What came back, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            ..Self::new(status, body)
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and reports either a response or a transport failure.
///
/// Any HTTP status counts as a response; only failures to get one at all
/// (connect, DNS, timeout, broken body) are `Err`.
pub trait Transport: Send + Sync {
    fn post(
        &self,
        request: WireRequest,
    ) -> impl Future<Output = Result<WireResponse, TransportFailure>> + Send;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn post(&self, request: WireRequest) -> Result<WireResponse, TransportFailure> {
        let response = self
            .client
            .post(&request.url)
            .header(reqwest::header::CONTENT_TYPE, request.content_type)
            .body(request.body.to_vec())
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| classify(&e))?.to_vec();

        Ok(WireResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Map a reqwest error onto the transport taxonomy.
fn classify(error: &reqwest::Error) -> TransportFailure {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        if mentions_dns(error) {
            TransportErrorKind::Dns
        } else {
            TransportErrorKind::ConnectionRefused
        }
    } else {
        TransportErrorKind::Other
    };
    TransportFailure::new(kind, error_chain(error))
}

// hyper reports resolver failures as connect errors; the cause text is the
// only place the distinction survives.
fn mentions_dns(error: &reqwest::Error) -> bool {
    let chain = error_chain(error).to_ascii_lowercase();
    chain.contains("dns error") || chain.contains("failed to lookup address")
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
