//! Convenience re-exports for the common case.
//!
//! ```
//! use relaymcp_client::prelude::*;
//! ```

pub use crate::client::{Client, ClientBuilder};
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, ClientResult};
pub use crate::handlers::{
    AsyncElicitationHandler, AsyncRootsHandler, AsyncSamplingHandler, ElicitationHandler,
    HandlerError, HandlerResult, RootsHandler, SamplingHandler,
};

pub use relaymcp_protocol::types::{
    CallToolResult, Content, CreateMessageRequest, CreateMessageResult, ElicitRequest,
    ElicitResult, InitializeResult, ListToolsResult, LoggingLevel, Root,
};
pub use relaymcp_transport::{
    CircuitState, HttpTransport, HttpTransportConfig, ProcessTransport, ProcessTransportConfig,
    Transport,
};
