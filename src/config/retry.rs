//! `[retry]` section: how often and how patiently a transport failure is
//! retried.
//!
//! Only transport failures (connection refused, timeout, DNS) are retried.
//! Every retry of a call targets the endpoint that call captured; moving to
//! another endpoint takes an explicit invalidate-and-resolve by the caller.
//!
//! ```toml
//! [retry]
//! max_retries = 4        # 5 attempts in total
//! base_delay_ms = 250
//! strategy = "exponential"
//! timeout_seconds = 60   # no new attempt starts after this
//! jitter_factor = 0.1
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest single backoff, as a multiple of the base delay.
const MAX_DELAY_MULTIPLIER: u32 = 100;

/// Bounded retry policy for transport failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Master switch; when false every call makes exactly one attempt
    pub enabled: bool,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Backoff unit in milliseconds
    pub base_delay_ms: u64,

    pub strategy: RetryStrategy,

    /// Retry window measured from the first attempt, in seconds
    pub timeout_seconds: u64,

    /// Fraction of each delay added as jitter (0.0 to 1.0, half is applied)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 4,
            base_delay_ms: 250,
            strategy: RetryStrategy::Exponential,
            timeout_seconds: 60,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Total attempts a single call may make, first attempt included.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Sleep before retry number `retry` (the first retry is 1).
    ///
    /// Never longer than the retry window or `MAX_DELAY_MULTIPLIER` base
    /// delays, whichever is shorter.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let base = self.base_delay();
        let retry = retry.max(1);
        let raw = match self.strategy {
            RetryStrategy::Constant => base,
            RetryStrategy::Linear => base.saturating_mul(retry),
            RetryStrategy::Exponential => base.saturating_mul(1u32 << (retry - 1).min(31)),
        };
        let jitter_ms = raw.as_millis() as f64 * self.jitter_factor.clamp(0.0, 1.0) / 2.0;
        raw.saturating_add(Duration::from_millis(jitter_ms.round() as u64))
            .min(self.timeout())
            .min(base.saturating_mul(MAX_DELAY_MULTIPLIER))
    }

    /// Whether another attempt may start after `attempts_made` attempts that
    /// have taken `elapsed` so far.
    pub fn should_retry(&self, attempts_made: u32, elapsed: Duration) -> bool {
        self.enabled && attempts_made < self.max_attempts() && elapsed < self.timeout()
    }
}

/// How the delay grows between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// `base` every time
    Constant,
    /// `base * n` before retry n
    Linear,
    /// `base * 2^(n-1)` before retry n
    #[default]
    Exponential,
}
