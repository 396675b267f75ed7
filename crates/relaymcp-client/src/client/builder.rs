//! Client builder.

use std::sync::Arc;

use relaymcp_transport::Transport;

use super::core::Client;
use crate::config::ClientConfig;
use crate::handlers::{
    AsyncElicitationHandler, AsyncRootsHandler, AsyncSamplingHandler, ElicitationHandler,
    RootsHandler, SamplingHandler,
};

/// Fluent construction of a [`Client`]: configuration plus handler
/// wiring before the first connect.
///
/// ```no_run
/// # use relaymcp_client::{ClientBuilder, ClientConfig};
/// # use relaymcp_transport::{ProcessTransport, ProcessTransportConfig};
/// # async fn example() -> relaymcp_client::ClientResult<()> {
/// let transport = ProcessTransport::new(ProcessTransportConfig::new("my-server"));
/// let client = ClientBuilder::new()
///     .with_config(ClientConfig::default())
///     .build(transport);
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    elicitation: Option<Arc<dyn ElicitationHandler>>,
    async_elicitation: Option<Arc<dyn AsyncElicitationHandler>>,
    sampling: Option<Arc<dyn SamplingHandler>>,
    async_sampling: Option<Arc<dyn AsyncSamplingHandler>>,
    roots: Option<Arc<dyn RootsHandler>>,
    async_roots: Option<Arc<dyn AsyncRootsHandler>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Start with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a synchronous elicitation handler.
    pub fn with_elicitation_handler(mut self, handler: Arc<dyn ElicitationHandler>) -> Self {
        self.elicitation = Some(handler);
        self
    }

    /// Register an asynchronous elicitation handler (wins over the
    /// synchronous one when both are set).
    pub fn with_async_elicitation_handler(
        mut self,
        handler: Arc<dyn AsyncElicitationHandler>,
    ) -> Self {
        self.async_elicitation = Some(handler);
        self
    }

    /// Register a synchronous sampling handler.
    pub fn with_sampling_handler(mut self, handler: Arc<dyn SamplingHandler>) -> Self {
        self.sampling = Some(handler);
        self
    }

    /// Register an asynchronous sampling handler (wins over the
    /// synchronous one when both are set).
    pub fn with_async_sampling_handler(mut self, handler: Arc<dyn AsyncSamplingHandler>) -> Self {
        self.async_sampling = Some(handler);
        self
    }

    /// Register a synchronous roots handler.
    pub fn with_roots_handler(mut self, handler: Arc<dyn RootsHandler>) -> Self {
        self.roots = Some(handler);
        self
    }

    /// Register an asynchronous roots handler (wins over the
    /// synchronous one when both are set).
    pub fn with_async_roots_handler(mut self, handler: Arc<dyn AsyncRootsHandler>) -> Self {
        self.async_roots = Some(handler);
        self
    }

    /// Build the client over `transport`.
    pub fn build<T: Transport + 'static>(self, transport: T) -> Client<T> {
        let client = Client::with_config(transport, self.config);
        let registry = client.handlers();
        if let Some(handler) = self.elicitation {
            registry.set_elicitation_handler(handler);
        }
        if let Some(handler) = self.async_elicitation {
            registry.set_async_elicitation_handler(handler);
        }
        if let Some(handler) = self.sampling {
            registry.set_sampling_handler(handler);
        }
        if let Some(handler) = self.async_sampling {
            registry.set_async_sampling_handler(handler);
        }
        if let Some(handler) = self.roots {
            registry.set_roots_handler(handler);
        }
        if let Some(handler) = self.async_roots {
            registry.set_async_roots_handler(handler);
        }
        client
    }
}
