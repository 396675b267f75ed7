//! Core client implementation.
//!
//! `Client<T>` owns the transport, the pending-request table, the
//! circuit breaker, the handler registry, and the inbound dispatcher
//! task. Public operations are thin typed wrappers over
//! [`send_request`](Client::send_request); the dispatcher resolves those
//! requests and services server-initiated traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use relaymcp_protocol::jsonrpc::{JsonRpcNotification, JsonRpcRequest};
use relaymcp_protocol::types::{
    ClientCapabilities, ElicitationCapabilities, Implementation, InitializeRequest,
    InitializeResult, PROTOCOL_VERSION, RootsCapabilities, SamplingCapabilities,
    ServerCapabilities, methods,
};
use relaymcp_transport::{CircuitBreaker, CircuitBreakerStats, CircuitState, Transport};

use super::dispatcher::spawn_dispatcher;
use super::observers::NotificationObservers;
use super::pending::PendingRequests;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::handlers::HandlerRegistry;

/// State shared between the facade and the dispatcher task.
pub(crate) struct ClientInner<T: Transport + 'static> {
    pub(crate) config: ClientConfig,
    pub(crate) transport: T,
    pub(crate) pending: PendingRequests,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) observers: NotificationObservers,
    pub(crate) shutdown: Notify,

    connected: AtomicBool,
    initialized: AtomicBool,
    shutting_down: AtomicBool,
    init_result: StdMutex<Option<InitializeResult>>,
}

impl<T: Transport + 'static> ClientInner<T> {
    /// Called by the dispatcher when the transport dies underneath us.
    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
    }
}

/// The MCP client facade.
///
/// Construct with a transport (see [`ClientBuilder`](crate::ClientBuilder)
/// for handler and observer wiring), call [`connect`](Client::connect),
/// then use the typed operations. The client is cheap to share behind an
/// `Arc` and safe to drop with requests still in flight: outstanding
/// awaiters resolve with a transport error and late timers observe the
/// shutdown flag and do nothing.
pub struct Client<T: Transport + 'static> {
    pub(crate) inner: Arc<ClientInner<T>>,
    dispatcher: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<T: Transport + 'static> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connected", &self.is_connected())
            .field("initialized", &self.is_initialized())
            .field("pending", &self.inner.pending.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport + 'static> Client<T> {
    /// Create a client over `transport` with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    /// Create a client over `transport` with the given configuration.
    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        let breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                pending: PendingRequests::new(),
                breaker,
                handlers: HandlerRegistry::new(),
                observers: NotificationObservers::default(),
                shutdown: Notify::new(),
                connected: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                init_result: StdMutex::new(None),
            }),
            dispatcher: StdMutex::new(None),
        }
    }

    // ── lifecycle ────────────────────────────────────────────────────

    /// Connect the transport and, unless `auto_initialize` is off, run
    /// the initialization handshake.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the underlying channel cannot be
    /// opened, or whatever [`initialize`](Client::initialize) surfaces.
    pub async fn connect(&self) -> ClientResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.inner.shutting_down.store(false, Ordering::SeqCst);

        self.inner.transport.start().await?;
        self.inner.connected.store(true, Ordering::SeqCst);

        let handle = spawn_dispatcher(Arc::clone(&self.inner));
        *self.dispatcher.lock().expect("dispatcher slot poisoned") = Some(handle);
        info!("client connected");

        if self.inner.config.auto_initialize
            && let Err(e) = self.initialize().await
        {
            warn!("initialize failed, tearing the connection back down: {e}");
            self.disconnect().await;
            return Err(e);
        }
        Ok(())
    }

    /// Run the `initialize` handshake explicitly (for clients built with
    /// `auto_initialize = false`).
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before [`connect`](Client::connect), or the
    /// server's error when it rejects the handshake.
    pub async fn initialize(&self) -> ClientResult<InitializeResult> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if let Some(result) = self.inner.init_result.lock().expect("init poisoned").clone() {
            return Ok(result);
        }

        let request = InitializeRequest {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.advertised_capabilities(),
            client_info: Implementation {
                name: self.inner.config.client_name.clone(),
                version: self.inner.config.client_version.clone(),
                title: None,
            },
        };

        let raw = self
            .send_request(
                methods::INITIALIZE,
                Some(serde_json::to_value(&request).map_err(|e| {
                    ClientError::Protocol(format!("failed to serialize initialize request: {e}"))
                })?),
            )
            .await?;

        let result: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| ClientError::Protocol(format!("invalid initialize result: {e}")))?;

        *self.inner.init_result.lock().expect("init poisoned") = Some(result.clone());
        self.inner.initialized.store(true, Ordering::SeqCst);
        info!(
            "initialized against {} {}",
            result.server_info.name, result.server_info.version
        );

        self.send_notification(methods::INITIALIZED, None).await?;
        Ok(result)
    }

    /// Disconnect: stop the dispatcher, close the transport, and resolve
    /// every outstanding request with a transport error.
    pub async fn disconnect(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();

        let handle = self
            .dispatcher
            .lock()
            .expect("dispatcher slot poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        self.inner.transport.stop().await;
        self.inner
            .pending
            .fail_all(ClientError::Transport("client disconnected".to_string()));

        self.inner.mark_disconnected();
        *self.inner.init_result.lock().expect("init poisoned") = None;
        info!("client disconnected");
    }

    /// Whether the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Whether initialization has completed.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_initialized(&self) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if !self.is_initialized() {
            return Err(ClientError::NotInitialized);
        }
        Ok(())
    }

    // ── server information ───────────────────────────────────────────

    /// Server identity from the initialize handshake.
    pub fn server_info(&self) -> Option<Implementation> {
        self.inner
            .init_result
            .lock()
            .expect("init poisoned")
            .as_ref()
            .map(|r| r.server_info.clone())
    }

    /// Server capabilities from the initialize handshake.
    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.inner
            .init_result
            .lock()
            .expect("init poisoned")
            .as_ref()
            .map(|r| r.capabilities.clone())
    }

    /// Server usage instructions from the initialize handshake.
    pub fn server_instructions(&self) -> Option<String> {
        self.inner
            .init_result
            .lock()
            .expect("init poisoned")
            .as_ref()
            .and_then(|r| r.instructions.clone())
    }

    // ── low-level request plumbing ───────────────────────────────────

    /// Send a raw request and await its response payload.
    ///
    /// The pipeline: connection gate, breaker admission, id allocation
    /// and awaiter parking, transport write, then an awaited response
    /// bounded by the per-request timeout.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] per the taxonomy; `CircuitOpen` rejections
    /// happen before the transport is touched.
    pub async fn send_request(&self, method: &str, params: Option<Value>) -> ClientResult<Value> {
        if self.inner.shutting_down.load(Ordering::SeqCst) || !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let breaker_enabled = self.inner.config.enable_circuit_breaker;
        if breaker_enabled && !self.inner.breaker.try_acquire() {
            debug!("request {method} rejected: circuit open");
            return Err(ClientError::CircuitOpen);
        }

        let id = self.inner.pending.allocate_id();
        let mut rx = self.inner.pending.park(id);

        let request = JsonRpcRequest::new(id, method, params);
        let encoded = serde_json::to_value(&request)
            .map_err(|e| ClientError::Protocol(format!("failed to serialize request: {e}")))?;

        if let Err(e) = self.inner.transport.send(encoded).await {
            self.inner.pending.remove(id);
            if breaker_enabled {
                self.inner.breaker.record_failure();
            }
            return Err(e.into());
        }

        // The timeout clock starts once the transport write completed.
        let outcome =
            tokio::time::timeout(self.inner.config.request_timeout, &mut rx).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_sender_dropped)) => {
                Err(ClientError::Transport("connection closed".to_string()))
            }
            Err(_elapsed) => {
                if self.inner.pending.remove(id).is_some() {
                    debug!("request {method} (id {id}) timed out");
                    Err(ClientError::Timeout)
                } else {
                    // The dispatcher resolved the entry in the race
                    // window between expiry and removal; take its answer.
                    match rx.await {
                        Ok(result) => result,
                        Err(_) => Err(ClientError::Transport("connection closed".to_string())),
                    }
                }
            }
        };

        if breaker_enabled {
            match &result {
                // A well-formed RPC error still proves the transport
                // works, so it counts as a breaker success.
                Ok(_) | Err(ClientError::Rpc { .. }) => self.inner.breaker.record_success(),
                Err(ClientError::Timeout) | Err(ClientError::Transport(_)) => {
                    self.inner.breaker.record_failure();
                }
                // Cancellation is no verdict on the server; just give
                // back any half-open trial slot the request held.
                Err(_) => self.inner.breaker.release(),
            }
        }

        result
    }

    /// Send a fire-and-forget notification.
    ///
    /// # Errors
    ///
    /// `NotConnected` before connect, or a transport error from the
    /// write; no id, no pending entry, no timeout, no breaker
    /// accounting.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let notification = JsonRpcNotification::new(method, params);
        let encoded = serde_json::to_value(&notification)
            .map_err(|e| ClientError::Protocol(format!("failed to serialize notification: {e}")))?;
        self.inner.transport.send(encoded).await?;
        Ok(())
    }

    /// Cancel an in-flight request: notify the server and resolve the
    /// local awaiter with [`ClientError::Cancelled`] immediately, without
    /// waiting for any acknowledgment.
    ///
    /// # Errors
    ///
    /// `NotConnected` when the client is not connected; the notification
    /// write error otherwise. The local resolution happens regardless.
    pub async fn cancel_request(&self, id: u64, reason: Option<&str>) -> ClientResult<()> {
        let params = serde_json::json!({
            "requestId": id,
            "reason": reason,
        });

        // Resolve locally first so the awaiter never waits on the server.
        if self.inner.pending.resolve(id, Err(ClientError::Cancelled)) {
            debug!("request {id} cancelled locally");
        }

        self.send_notification(methods::CANCELLED, Some(params)).await
    }

    // ── circuit breaker surface ──────────────────────────────────────

    /// Current circuit breaker state.
    pub fn circuit_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    /// Whether the breaker currently rejects requests.
    pub fn is_circuit_open(&self) -> bool {
        self.circuit_state() == CircuitState::Open
    }

    /// Circuit breaker counters.
    pub fn circuit_stats(&self) -> CircuitBreakerStats {
        self.inner.breaker.stats()
    }

    /// Force the breaker open (operational kill switch).
    pub fn force_circuit_open(&self) {
        self.inner.breaker.force_open();
    }

    /// Force the breaker closed (operational recovery).
    pub fn force_circuit_closed(&self) {
        self.inner.breaker.force_closed();
    }

    /// Register a breaker state-change callback.
    pub fn on_circuit_state_change<F>(&self, callback: F)
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.inner.breaker.on_state_change(callback);
    }

    // ── capability handlers ──────────────────────────────────────────

    /// The handler registry for server-initiated requests.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    fn advertised_capabilities(&self) -> ClientCapabilities {
        let mut capabilities = self.inner.config.capabilities.clone();
        if capabilities.sampling.is_none() && self.inner.handlers.has_sampling_handler() {
            capabilities.sampling = Some(SamplingCapabilities::default());
        }
        if capabilities.elicitation.is_none() && self.inner.handlers.has_elicitation_handler() {
            capabilities.elicitation = Some(ElicitationCapabilities::default());
        }
        if capabilities.roots.is_none() && self.inner.handlers.has_roots_handler() {
            capabilities.roots = Some(RootsCapabilities {
                list_changed: Some(true),
            });
        }
        capabilities
    }

    // ── notification observers ───────────────────────────────────────

    /// Observe every notification, routed or not.
    pub fn on_notification<F>(&self, callback: F)
    where
        F: Fn(&str, Option<&Value>) + Send + Sync + 'static,
    {
        self.inner.observers.on_notification(callback);
    }

    /// Observe `tools/list_changed`.
    pub fn on_tool_list_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.on_tool_list_changed(callback);
    }

    /// Observe `resources/list_changed`.
    pub fn on_resource_list_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.on_resource_list_changed(callback);
    }

    /// Observe `resources/updated`; the callback receives the URI.
    pub fn on_resource_updated<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.observers.on_resource_updated(callback);
    }

    /// Observe `prompts/list_changed`.
    pub fn on_prompt_list_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.on_prompt_list_changed(callback);
    }

    /// Observe server log messages.
    pub fn on_log_message<F>(&self, callback: F)
    where
        F: Fn(&relaymcp_protocol::types::LoggingMessageNotification) + Send + Sync + 'static,
    {
        self.inner.observers.on_log_message(callback);
    }

    /// Observe progress notifications.
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&relaymcp_protocol::types::ProgressNotification) + Send + Sync + 'static,
    {
        self.inner.observers.on_progress(callback);
    }
}

impl<T: Transport + 'static> Drop for Client<T> {
    fn drop(&mut self) {
        // The dispatcher holds a strong handle to the shared state; the
        // shutdown flag plus abort guarantees the facade can drop last
        // without waiting for in-flight I/O.
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        if let Some(handle) = self
            .dispatcher
            .lock()
            .expect("dispatcher slot poisoned")
            .take()
        {
            handle.abort();
        }
    }
}
