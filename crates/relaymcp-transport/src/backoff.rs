//! Backoff strategies for retry delays.
//!
//! A [`Backoff`] decides *how long* to wait before the next attempt; the
//! [`RetryPolicy`](crate::retry::RetryPolicy) decides *whether* to retry
//! at all. Keeping the two separate lets tests inject [`NoBackoff`] and
//! lets callers swap strategies without touching retry classification.

use std::time::Duration;

/// Strategy for computing the delay before retry attempt `attempt`
/// (0-indexed: 0 is the first retry after the initial failure).
pub trait Backoff: Send + Sync + std::fmt::Debug {
    /// Delay before the given retry attempt.
    fn delay(&self, attempt: usize) -> Duration;

    /// Reset internal state after a successful request. Most strategies
    /// are stateless and treat this as a no-op.
    fn reset(&self) {}
}

/// Exponential backoff with full jitter.
///
/// `delay = min(base * multiplier^attempt, max) * rand(1 - jitter, 1 + jitter)`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    multiplier: f64,
    max: Duration,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a strategy with explicit parameters.
    ///
    /// `jitter` is a fraction: 0.0 disables jitter, 0.25 yields ±25%.
    pub fn new(base: Duration, multiplier: f64, max: Duration, jitter: f64) -> Self {
        Self {
            base,
            multiplier,
            max,
            jitter,
        }
    }
}

impl Default for ExponentialBackoff {
    /// 100 ms base, 2x multiplier, 30 s cap, ±25% jitter.
    fn default() -> Self {
        Self::new(
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(30),
            0.25,
        )
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        let base_ms = self.base.as_millis() as f64;
        let raw_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = raw_ms.min(self.max.as_millis() as f64);

        let jittered_ms = if self.jitter > 0.0 {
            let factor = 1.0 - self.jitter + fastrand::f64() * 2.0 * self.jitter;
            capped_ms * factor
        } else {
            capped_ms
        };

        Duration::from_millis(jittered_ms.max(0.0) as u64)
    }
}

/// Fixed delay between attempts.
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    /// Create a strategy that always waits `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for ConstantBackoff {
    fn delay(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

/// Zero delay. For tests.
#[derive(Debug, Clone, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: usize) -> Duration {
        Duration::ZERO
    }
}
