//! Streamable HTTP transport.

pub mod config;
pub mod sse;
pub mod transport;

pub use config::{HttpTransportConfig, TlsConfig};
pub use sse::{SseEvent, SseParser};
pub use transport::{HttpTransport, LAST_EVENT_ID_HEADER, SESSION_ID_HEADER, get_header};
