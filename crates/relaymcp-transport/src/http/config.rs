//! HTTP transport configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{Backoff, ExponentialBackoff};
use crate::retry::RetryPolicy;
use crate::session::SessionManagerConfig;

/// TLS settings for HTTPS endpoints.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Whether to verify the server certificate chain. Disabling this is
    /// a security risk and should only happen in test environments.
    pub validate_certificates: bool,
    /// Additional root certificates (PEM or DER bytes).
    pub custom_ca_certs: Vec<Vec<u8>>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            validate_certificates: true,
            custom_ca_certs: Vec::new(),
        }
    }
}

/// Streamable HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the server, e.g. `https://api.example.com`
    pub base_url: String,

    /// Endpoint path appended to the base URL, e.g. `/mcp`.
    /// Validated against traversal before any request is built.
    pub endpoint_path: String,

    /// Headers sent with every request (authorization, user agent, ...)
    pub default_headers: HashMap<String, String>,

    /// Maximum time to establish a TCP connection
    pub connect_timeout: Duration,

    /// Maximum time to wait for a POST response
    pub read_timeout: Duration,

    /// Delay before reconnecting a closed server-event stream
    pub sse_reconnect_delay: Duration,

    /// Maximum request body size in bytes (0 = unlimited)
    pub max_request_body_size: usize,

    /// Whether `start` opens the long-lived GET stream for
    /// server-initiated messages
    pub auto_open_sse_stream: bool,

    /// TLS settings (used when the base URL is https)
    pub tls: TlsConfig,

    /// Retry classification for failed POSTs
    pub retry: RetryPolicy,

    /// Delay strategy between retry attempts
    pub backoff: Arc<dyn Backoff>,

    /// Session accounting (reconnect attempt limit)
    pub session: SessionManagerConfig,

    /// Client identity used when the transport re-establishes an expired
    /// session on its own
    pub client_name: String,
    /// Client version used alongside `client_name`
    pub client_version: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            endpoint_path: "/mcp".to_string(),
            default_headers: HashMap::new(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            sse_reconnect_delay: Duration::from_millis(100),
            max_request_body_size: 10 * 1024 * 1024,
            auto_open_sse_stream: true,
            tls: TlsConfig::default(),
            retry: RetryPolicy::default(),
            backoff: Arc::new(ExponentialBackoff::default()),
            session: SessionManagerConfig::default(),
            client_name: "relaymcp".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl HttpTransportConfig {
    /// Config pointed at `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Add a `Authorization: Bearer ...` default header.
    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.default_headers
            .insert("Authorization".to_string(), format!("Bearer {token}"));
        self
    }

    /// Add a default header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Set the endpoint path.
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the SSE reconnect delay.
    pub fn with_sse_reconnect_delay(mut self, delay: Duration) -> Self {
        self.sse_reconnect_delay = delay;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the backoff strategy.
    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enable or disable the long-lived server-event stream.
    pub fn with_auto_open_sse_stream(mut self, enable: bool) -> Self {
        self.auto_open_sse_stream = enable;
        self
    }
}
