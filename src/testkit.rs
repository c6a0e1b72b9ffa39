//! Test doubles for dispatch without a network.
//!
//! [`ScriptedTransport`] plays back a fixed sequence of outcomes and records
//! every request it receives, so tests can assert on attempt counts, URLs,
//! and bodies.
//!
//! ```rust
//! use insightlink::client::{Transport, WireRequest, WireResponse};
//! use insightlink::errors::TransportFailure;
//! use insightlink::testkit::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new()
//!     .fail(TransportFailure::timeout("slow"))
//!     .respond(WireResponse::json(200, "{}"));
//! assert_eq!(transport.remaining(), 2);
//! ```

use crate::client::{Transport, WireRequest, WireResponse};
use crate::config::{RetryConfig, RetryStrategy};
use crate::errors::TransportFailure;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    Respond(WireResponse),
    Fail(TransportFailure),
    /// Sleep, then run the inner step.
    Delay(Duration, Box<Step>),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    fallback: Option<Step>,
    requests: Vec<WireRequest>,
}

/// Transport that replays scripted outcomes in order.
///
/// Clones share the same script and request log. Running past the end of the
/// script without a fallback yields a `TransportFailure` of kind `Other`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: WireResponse) -> Self {
        self.push(Step::Respond(response))
    }

    pub fn fail(self, failure: TransportFailure) -> Self {
        self.push(Step::Fail(failure))
    }

    /// Respond only after `delay`, to exercise cancellation mid-flight.
    pub fn respond_after(self, delay: Duration, response: WireResponse) -> Self {
        self.push(Step::Delay(delay, Box::new(Step::Respond(response))))
    }

    /// Every request beyond the script fails with `failure`.
    pub fn fail_always(self, failure: TransportFailure) -> Self {
        self.script.lock().fallback = Some(Step::Fail(failure));
        self
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().steps.push_back(step);
        self
    }

    pub fn attempts(&self) -> usize {
        self.script.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.script.lock().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().steps.len()
    }

    fn next_step(&self, request: WireRequest) -> Step {
        let mut script = self.script.lock();
        script.requests.push(request);
        script
            .steps
            .pop_front()
            .or_else(|| script.fallback.clone())
            .unwrap_or_else(|| {
                Step::Fail(TransportFailure::new(
                    crate::errors::TransportErrorKind::Other,
                    "script exhausted",
                ))
            })
    }
}

impl Transport for ScriptedTransport {
    async fn post(&self, request: WireRequest) -> Result<WireResponse, TransportFailure> {
        let mut step = self.next_step(request);
        loop {
            match step {
                Step::Respond(response) => return Ok(response),
                Step::Fail(failure) => return Err(failure),
                Step::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
            }
        }
    }
}

/// Retry config with millisecond delays and `max_retries` retries.
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        enabled: true,
        max_retries,
        base_delay_ms: 1,
        strategy: RetryStrategy::Exponential,
        timeout_seconds: 30,
        jitter_factor: 0.0,
    }
}
