//! Client error taxonomy.

use serde_json::Value;
use thiserror::Error;

use relaymcp_transport::TransportError;

/// A specialized `Result` type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by client operations.
///
/// The set is closed: every public operation resolves to exactly one of
/// these, and no other error type escapes the client.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// The client is not connected to a server
    #[error("Client is not connected")]
    NotConnected,

    /// The client has not completed initialization
    #[error("Client has not completed initialization")]
    NotInitialized,

    /// Transport-layer failure (I/O, framing, HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed JSON or structurally invalid protocol message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-formed error response from the server
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// Server error code
        code: i32,
        /// Server error message
        message: String,
        /// Additional error data
        data: Option<Value>,
    },

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The request was cancelled by the caller
    #[error("Request was cancelled")]
    Cancelled,

    /// Admission was refused by the circuit breaker
    #[error("Circuit breaker is open")]
    CircuitOpen,
}

impl ClientError {
    /// Build an `Rpc` variant from a wire error object.
    pub fn from_rpc(error: relaymcp_protocol::JsonRpcError) -> Self {
        Self::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    /// Whether a caller-driven retry of the same operation could
    /// plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<TransportError> for ClientError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout => Self::Timeout,
            TransportError::Parse(msg) | TransportError::Protocol(msg) => Self::Protocol(msg),
            TransportError::InvalidResponse(msg) => Self::Protocol(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_mapping() {
        assert!(matches!(
            ClientError::from(TransportError::Timeout),
            ClientError::Timeout
        ));
        assert!(matches!(
            ClientError::from(TransportError::Parse("bad".into())),
            ClientError::Protocol(_)
        ));
        assert!(matches!(
            ClientError::from(TransportError::Closed),
            ClientError::Transport(_)
        ));
        assert!(matches!(
            ClientError::from(TransportError::SessionExpired),
            ClientError::Transport(_)
        ));
    }

    #[test]
    fn retryability() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Transport("reset".into()).is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
        assert!(!ClientError::NotConnected.is_retryable());
        assert!(!ClientError::CircuitOpen.is_retryable());
        assert!(
            !ClientError::Rpc {
                code: -32601,
                message: "nope".into(),
                data: None
            }
            .is_retryable()
        );
    }
}
