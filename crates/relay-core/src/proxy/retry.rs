//! Retry bounds and backoff for the upstream attempt loop.

use crate::{types::UpstreamEnvelope, upstream::errors::UpstreamError};
use bytes::Bytes;
use std::time::Duration;

/// Configuration for retrying failed upstream attempts.
///
/// ```rust,ignore
/// use relay_core::proxy::retry::RetryPolicy;
///
/// let policy = RetryPolicy::default()
///     .with_max_retries(3)
///     .with_base_delay_ms(100)
///     .with_max_delay_ms(2000);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. A request makes at most `max_retries + 1` attempts.
    /// Default: 3
    pub max_retries: u32,

    /// Actual delay = `base_delay_ms * 2^attempt` (capped at `max_delay_ms`).
    /// Default: 100ms
    pub base_delay_ms: u64,

    /// Default: 10000ms
    pub max_delay_ms: u64,

    /// Jitter factor (0.0-1.0). A value of 0.25 spreads delays by ±12.5%.
    /// Default: 0.0, so delays are exactly the exponential schedule.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 100, max_delay_ms: 10_000, jitter_factor: 0.0 }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    #[must_use]
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    #[must_use]
    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Total attempts allowed for one request.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to sleep after the failed attempt with index `attempt` (0-indexed).
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let base_delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(20));
        let capped_delay = base_delay.min(self.max_delay_ms);

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jitter_range = (capped_delay as f64 * self.jitter_factor) as u64;
        let jitter_offset = if jitter_range > 0 { rand::rng().random_range(0..jitter_range) } else { 0 };

        Duration::from_millis(capped_delay.saturating_sub(jitter_range / 2) + jitter_offset)
    }

    /// Returns true if another attempt may follow attempt `attempt` (0-indexed).
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Result of one upstream attempt, as seen by the attempt loop.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 2xx with a well-formed JSON-RPC body. The loop stops.
    Success { body: Bytes, latency_ms: u64, envelope: UpstreamEnvelope },
    /// Worth another attempt, possibly on another endpoint.
    Retryable(UpstreamError),
    /// Stop immediately; retrying cannot help.
    Fatal(UpstreamError),
}

impl AttemptOutcome {
    #[must_use]
    pub fn from_error(error: UpstreamError) -> Self {
        if error.is_retryable() {
            Self::Retryable(error)
        } else {
            Self::Fatal(error)
        }
    }
}
