//! Core transport trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportResult;

/// An ordered, reliable, bidirectional JSON-value channel.
///
/// Implementations guarantee:
///
/// - **Framing**: each `send` writes exactly one complete message; a short
///   write on the underlying descriptor is retried until the whole payload
///   is flushed before another `send` may start.
/// - **Serialized sends**: concurrent callers of `send` are serialized, so
///   frames never interleave.
/// - **Cancel-safe receive**: dropping a `receive` future loses no
///   messages; the next call yields the next complete inbound message.
/// - **Idempotent stop**: `stop` releases resources and cancels in-flight
///   I/O; calling it twice is harmless, and `start` after `stop`
///   re-initializes the transport.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Open the underlying channel and start the reader.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the channel cannot be established
    /// (spawn failure, unreachable endpoint, invalid configuration).
    async fn start(&self) -> TransportResult<()>;

    /// Release resources and cancel in-flight I/O. Idempotent.
    async fn stop(&self);

    /// Send one complete message.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the transport is not running or the
    /// write fails; the message is either fully written or not written.
    async fn send(&self, message: Value) -> TransportResult<()>;

    /// Return the next complete inbound message.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the channel is closed or the peer
    /// produced an unreadable frame.
    async fn receive(&self) -> TransportResult<Value>;

    /// Whether the transport is currently running.
    fn is_running(&self) -> bool;
}
