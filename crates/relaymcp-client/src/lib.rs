//! # relaymcp-client
//!
//! Client runtime for MCP-style JSON-RPC 2.0 servers: a request
//! multiplexer with per-request timeouts and cancellation, an inbound
//! dispatcher routing responses, notifications, and server-initiated
//! requests, a circuit breaker gating outbound traffic, and typed
//! operations for every capability (tools, resources, prompts,
//! completion, logging, sampling, elicitation, roots).
//!
//! ```no_run
//! use relaymcp_client::Client;
//! use relaymcp_transport::{ProcessTransport, ProcessTransportConfig};
//!
//! # async fn example() -> relaymcp_client::ClientResult<()> {
//! let transport = ProcessTransport::new(
//!     ProcessTransportConfig::new("my-mcp-server").with_args(["--stdio"]),
//! );
//! let client = Client::new(transport);
//! client.connect().await?;
//!
//! let tools = client.list_tools(None).await?;
//! for tool in &tools.tools {
//!     println!("{}", tool.name);
//! }
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod prelude;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use handlers::{
    AsyncElicitationHandler, AsyncRootsHandler, AsyncSamplingHandler, ElicitationHandler,
    HandlerError, HandlerRegistry, HandlerResult, RootsHandler, SamplingHandler,
};
