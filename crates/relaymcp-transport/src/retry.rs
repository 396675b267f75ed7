//! Retry classification for failed requests.
//!
//! Decides *which* failures are worth retrying; the
//! [`Backoff`](crate::backoff::Backoff) strategies decide how long to
//! wait. When a response carries a `Retry-After` header, the value parsed
//! by [`retry_after`] replaces the computed backoff for that attempt.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::TransportError;

/// Policy answering "should this failure be retried?"
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    retry_on_connection_error: bool,
    retry_on_timeout: bool,
    retry_on_ssl_error: bool,
    retryable_http_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_on_connection_error: true,
            retry_on_timeout: true,
            retry_on_ssl_error: false,
            retryable_http_statuses: [429, 500, 502, 503, 504].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default classification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retry attempts (not counting the
    /// initial request).
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Enable or disable retry on connection errors.
    pub fn with_retry_on_connection_error(mut self, enable: bool) -> Self {
        self.retry_on_connection_error = enable;
        self
    }

    /// Enable or disable retry on timeouts.
    pub fn with_retry_on_timeout(mut self, enable: bool) -> Self {
        self.retry_on_timeout = enable;
        self
    }

    /// Enable or disable retry on TLS errors.
    pub fn with_retry_on_ssl_error(mut self, enable: bool) -> Self {
        self.retry_on_ssl_error = enable;
        self
    }

    /// Add an HTTP status code to the retryable set.
    pub fn with_retryable_status(mut self, status: u16) -> Self {
        self.retryable_http_statuses.insert(status);
        self
    }

    /// Remove an HTTP status code from the retryable set.
    pub fn without_retryable_status(mut self, status: u16) -> Self {
        self.retryable_http_statuses.remove(&status);
        self
    }

    /// Maximum retry attempts.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Whether `error` should be retried on retry attempt `attempt`
    /// (0-indexed).
    pub fn should_retry(&self, error: &TransportError, attempt: usize) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        match error {
            e if e.is_connection_error() => self.retry_on_connection_error,

            TransportError::Timeout => self.retry_on_timeout,

            TransportError::Ssl(_) => self.retry_on_ssl_error,

            TransportError::HttpStatus { status, .. } => {
                self.should_retry_http_status(*status)
            }

            // SessionExpired is handled by the session layer; everything
            // else (parse, protocol, closed, size, configuration) is a
            // problem a retry cannot fix.
            _ => false,
        }
    }

    /// Whether an HTTP status code is in the retryable set.
    pub fn should_retry_http_status(&self, status: u16) -> bool {
        self.retryable_http_statuses.contains(&status)
    }
}

/// Parse a `Retry-After` header value: either non-negative integer
/// seconds, or an HTTP-date, whose delta from now becomes the delay.
/// A date in the past yields a zero delay.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let when = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = when.signed_duration_since(chrono::Utc::now());
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retryable_kinds() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(&TransportError::ConnectionFailed("refused".into()), 0));
        assert!(policy.should_retry(&TransportError::Timeout, 1));
        assert!(!policy.should_retry(&TransportError::Ssl("handshake".into()), 0));
        assert!(!policy.should_retry(&TransportError::Parse("bad json".into()), 0));
        assert!(!policy.should_retry(&TransportError::Closed, 0));
        assert!(!policy.should_retry(&TransportError::SessionExpired, 0));
        assert!(!policy.should_retry(
            &TransportError::InvalidResponse("empty body".into()),
            0
        ));
    }

    #[test]
    fn attempt_limit_bounds_everything() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&TransportError::Timeout, 2));
        assert!(!policy.should_retry(&TransportError::Timeout, 3));
        assert!(!policy.should_retry(&TransportError::Timeout, 4));
    }

    #[test]
    fn http_status_set() {
        let policy = RetryPolicy::default();
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry_http_status(status), "{status}");
        }
        assert!(!policy.should_retry_http_status(400));
        assert!(!policy.should_retry_http_status(404));
        assert!(!policy.should_retry_http_status(501));

        let custom = RetryPolicy::default()
            .with_retryable_status(418)
            .without_retryable_status(429);
        assert!(custom.should_retry_http_status(418));
        assert!(!custom.should_retry_http_status(429));
    }

    #[test]
    fn http_status_error_goes_through_status_set() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(
            &TransportError::HttpStatus {
                status: 503,
                message: "unavailable".into()
            },
            0
        ));
        assert!(!policy.should_retry(
            &TransportError::HttpStatus {
                status: 403,
                message: "forbidden".into()
            },
            0
        ));
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after("not a date"), None);
    }

    #[test]
    fn retry_after_http_date() {
        let future = chrono::Utc::now() + chrono::Duration::seconds(30);
        let header = future.to_rfc2822();
        let parsed = parse_retry_after(&header).unwrap();
        assert!(parsed <= Duration::from_secs(31));
        assert!(parsed >= Duration::from_secs(25));

        // Past dates clamp to zero rather than failing.
        let past = chrono::Utc::now() - chrono::Duration::seconds(30);
        assert_eq!(parse_retry_after(&past.to_rfc2822()), Some(Duration::ZERO));
    }
}
