//! Transport error types.

use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur during transport operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to send a message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a message.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The operation did not complete within the configured timeout.
    #[error("Operation timed out")]
    Timeout,

    /// Failed to parse an inbound payload as JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A structurally invalid protocol message or framing violation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The transport is stopped and cannot carry traffic.
    #[error("Transport closed")]
    Closed,

    /// The server no longer recognizes the session (HTTP 404 on a
    /// session-carrying request). Handled by the session layer, never
    /// retried at the transport level.
    #[error("Session expired")]
    SessionExpired,

    /// A non-success HTTP status with no more specific meaning.
    #[error("HTTP error {status}: {message}")]
    HttpStatus {
        /// The response status code
        status: u16,
        /// Status text or response body excerpt
        message: String,
    },

    /// TLS negotiation or certificate failure.
    #[error("TLS error: {0}")]
    Ssl(String),

    /// The response was well-formed at the HTTP level but not usable
    /// (unexpected content type, missing body).
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A message exceeded the configured size limit. Fatal for the
    /// transport that observed it.
    #[error("Message size ({size} bytes) exceeds maximum allowed ({max} bytes)")]
    MessageTooLarge {
        /// Actual payload size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// The transport was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl TransportError {
    /// Whether this error closes the door on the current attempt in a way
    /// a retry could help with. The retry policy makes the final call;
    /// this only rules out the categorically unretryable kinds.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::ConnectionLost(_) | Self::SendFailed(_) | Self::ReceiveFailed(_) | Self::Io(_)
        )
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
