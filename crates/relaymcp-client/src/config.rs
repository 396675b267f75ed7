//! Client configuration.

use std::time::Duration;

use relaymcp_protocol::types::ClientCapabilities;
use relaymcp_transport::CircuitBreakerConfig;

/// Configuration for a [`Client`](crate::Client)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client name advertised during `initialize`
    pub client_name: String,
    /// Client version advertised during `initialize`
    pub client_version: String,

    /// Per-request timeout, measured from the transport write
    pub request_timeout: Duration,
    /// Time a server-initiated request's handler may run before the
    /// dispatcher answers with an internal error on its behalf
    pub handler_timeout: Duration,

    /// Run the `initialize` handshake automatically during `connect`
    pub auto_initialize: bool,

    /// Gate outbound requests behind the circuit breaker
    pub enable_circuit_breaker: bool,
    /// Circuit breaker thresholds and timing
    pub circuit_breaker: CircuitBreakerConfig,

    /// Reject url-mode elicitations that are not HTTPS
    pub require_https_elicitation: bool,

    /// Capabilities advertised during `initialize`, merged with the
    /// capabilities implied by registered handlers
    pub capabilities: ClientCapabilities,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: "relaymcp".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            request_timeout: Duration::from_secs(30),
            handler_timeout: Duration::from_secs(60),
            auto_initialize: true,
            enable_circuit_breaker: true,
            circuit_breaker: CircuitBreakerConfig::default(),
            require_https_elicitation: true,
            capabilities: ClientCapabilities::default(),
        }
    }
}
