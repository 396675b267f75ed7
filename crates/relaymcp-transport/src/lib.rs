//! # relaymcp-transport
//!
//! Transports and resilience primitives for the relaymcp client runtime:
//!
//! - [`Transport`]: the ordered, bidirectional JSON-value channel the
//!   client crate builds on
//! - [`process::ProcessTransport`]: a child process over stdio with
//!   newline or `Content-Length` framing
//! - [`http::HttpTransport`]: streamable HTTP with SSE delivery and
//!   resumable sessions
//! - [`session::SessionManager`]: the session lifecycle state machine
//! - [`retry::RetryPolicy`] and [`backoff`]: failure classification and
//!   delay strategies
//! - [`circuit_breaker::CircuitBreaker`]: admission control for
//!   outbound requests

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod http;
pub mod process;
pub mod retry;
pub mod session;
pub mod traits;
pub mod validation;

pub use backoff::{Backoff, ConstantBackoff, ExponentialBackoff, NoBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use process::{Framing, ProcessTransport, ProcessTransportConfig, StderrMode};
pub use retry::{RetryPolicy, parse_retry_after};
pub use session::{SessionManager, SessionManagerConfig, SessionState};
pub use traits::Transport;
