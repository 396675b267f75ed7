//! Handler traits for server-initiated requests.
//!
//! The protocol is bidirectional: servers ask clients for user input
//! (elicitation), LLM inference (sampling), and workspace roots. Each
//! capability has a synchronous and an asynchronous handler form; when
//! both are registered, the asynchronous one wins. Registered handlers
//! also drive the capabilities advertised during `initialize`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use relaymcp_protocol::JsonRpcError;
use relaymcp_protocol::types::{
    CreateMessageRequest, CreateMessageResult, ElicitRequest, ElicitResult, Root,
};

/// Errors a capability handler can produce.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// The user cancelled the interaction
    #[error("User cancelled the operation")]
    UserCancelled,

    /// The handler gave up after its own internal deadline
    #[error("Handler timed out after {timeout_seconds} seconds")]
    Timeout {
        /// The deadline that was exceeded, in seconds
        timeout_seconds: u64,
    },

    /// User-provided input failed validation
    #[error("Invalid input: {details}")]
    InvalidInput {
        /// What was wrong with the input
        details: String,
    },

    /// The handler is registered but cannot serve this request
    #[error("Handler declined the request")]
    Declined,

    /// Anything else
    #[error("Handler error: {message}")]
    Generic {
        /// Failure description
        message: String,
    },
}

impl HandlerError {
    /// Map a handler failure to the wire error the dispatcher sends back.
    ///
    /// A declined request maps to an internal error distinct from an
    /// explicit handler error, per the response policy: errors keep
    /// their meaning, declines read as "no result produced".
    pub fn into_jsonrpc_error(&self) -> JsonRpcError {
        let (code, message) = match self {
            HandlerError::UserCancelled => (-32800, "User rejected the request".to_string()),
            HandlerError::Timeout { timeout_seconds } => (
                -32801,
                format!("Handler timed out after {timeout_seconds} seconds"),
            ),
            HandlerError::InvalidInput { details } => {
                (-32602, format!("Invalid input: {details}"))
            }
            HandlerError::Declined => {
                (-32603, "Handler produced no result".to_string())
            }
            HandlerError::Generic { message } => (-32603, format!("Handler error: {message}")),
        };
        JsonRpcError {
            code,
            message,
            data: None,
        }
    }
}

/// Result type for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;

// ── capability traits ────────────────────────────────────────────────

/// Synchronous elicitation handler.
///
/// Runs on a blocking thread, so it may freely perform blocking UI work.
pub trait ElicitationHandler: Send + Sync {
    /// Collect a user answer for the given request.
    fn handle_elicitation(&self, request: ElicitRequest) -> HandlerResult<ElicitResult>;
}

/// Asynchronous elicitation handler. Preferred over the synchronous form
/// when both are registered.
#[async_trait]
pub trait AsyncElicitationHandler: Send + Sync {
    /// Collect a user answer for the given request.
    async fn handle_elicitation(&self, request: ElicitRequest) -> HandlerResult<ElicitResult>;
}

/// Synchronous sampling handler: run an LLM inference for the server.
pub trait SamplingHandler: Send + Sync {
    /// Produce a sampled message for the request.
    fn handle_create_message(
        &self,
        request: CreateMessageRequest,
    ) -> HandlerResult<CreateMessageResult>;
}

/// Asynchronous sampling handler. Preferred over the synchronous form
/// when both are registered.
#[async_trait]
pub trait AsyncSamplingHandler: Send + Sync {
    /// Produce a sampled message for the request.
    async fn handle_create_message(
        &self,
        request: CreateMessageRequest,
    ) -> HandlerResult<CreateMessageResult>;
}

/// Synchronous roots handler: list the workspace roots exposed to the
/// server.
pub trait RootsHandler: Send + Sync {
    /// The roots to expose.
    fn list_roots(&self) -> HandlerResult<Vec<Root>>;
}

/// Asynchronous roots handler. Preferred over the synchronous form when
/// both are registered.
#[async_trait]
pub trait AsyncRootsHandler: Send + Sync {
    /// The roots to expose.
    async fn list_roots(&self) -> HandlerResult<Vec<Root>>;
}

// ── registry ─────────────────────────────────────────────────────────

/// Handler slots, snapshot-readable by the dispatcher.
#[derive(Default)]
struct Slots {
    elicitation: Option<Arc<dyn ElicitationHandler>>,
    async_elicitation: Option<Arc<dyn AsyncElicitationHandler>>,
    sampling: Option<Arc<dyn SamplingHandler>>,
    async_sampling: Option<Arc<dyn AsyncSamplingHandler>>,
    roots: Option<Arc<dyn RootsHandler>>,
    async_roots: Option<Arc<dyn AsyncRootsHandler>>,
}

/// Registry of capability handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    slots: Mutex<Slots>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().expect("handler mutex poisoned");
        f.debug_struct("HandlerRegistry")
            .field("elicitation", &slots.elicitation.is_some())
            .field("async_elicitation", &slots.async_elicitation.is_some())
            .field("sampling", &slots.sampling.is_some())
            .field("async_sampling", &slots.async_sampling.is_some())
            .field("roots", &slots.roots.is_some())
            .field("async_roots", &slots.async_roots.is_some())
            .finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous elicitation handler.
    pub fn set_elicitation_handler(&self, handler: Arc<dyn ElicitationHandler>) {
        self.slots.lock().expect("handler mutex poisoned").elicitation = Some(handler);
    }

    /// Register an asynchronous elicitation handler.
    pub fn set_async_elicitation_handler(&self, handler: Arc<dyn AsyncElicitationHandler>) {
        self.slots
            .lock()
            .expect("handler mutex poisoned")
            .async_elicitation = Some(handler);
    }

    /// Register a synchronous sampling handler.
    pub fn set_sampling_handler(&self, handler: Arc<dyn SamplingHandler>) {
        self.slots.lock().expect("handler mutex poisoned").sampling = Some(handler);
    }

    /// Register an asynchronous sampling handler.
    pub fn set_async_sampling_handler(&self, handler: Arc<dyn AsyncSamplingHandler>) {
        self.slots
            .lock()
            .expect("handler mutex poisoned")
            .async_sampling = Some(handler);
    }

    /// Register a synchronous roots handler.
    pub fn set_roots_handler(&self, handler: Arc<dyn RootsHandler>) {
        self.slots.lock().expect("handler mutex poisoned").roots = Some(handler);
    }

    /// Register an asynchronous roots handler.
    pub fn set_async_roots_handler(&self, handler: Arc<dyn AsyncRootsHandler>) {
        self.slots.lock().expect("handler mutex poisoned").async_roots = Some(handler);
    }

    /// Whether any elicitation handler is registered.
    pub fn has_elicitation_handler(&self) -> bool {
        let slots = self.slots.lock().expect("handler mutex poisoned");
        slots.elicitation.is_some() || slots.async_elicitation.is_some()
    }

    /// Whether any sampling handler is registered.
    pub fn has_sampling_handler(&self) -> bool {
        let slots = self.slots.lock().expect("handler mutex poisoned");
        slots.sampling.is_some() || slots.async_sampling.is_some()
    }

    /// Whether any roots handler is registered.
    pub fn has_roots_handler(&self) -> bool {
        let slots = self.slots.lock().expect("handler mutex poisoned");
        slots.roots.is_some() || slots.async_roots.is_some()
    }

    /// Run the elicitation handler, async form preferred. `None` when no
    /// handler is registered. Synchronous handlers run on a blocking
    /// thread.
    pub(crate) async fn handle_elicitation(
        &self,
        request: ElicitRequest,
    ) -> Option<HandlerResult<ElicitResult>> {
        let (sync_handler, async_handler) = {
            let slots = self.slots.lock().expect("handler mutex poisoned");
            (slots.elicitation.clone(), slots.async_elicitation.clone())
        };
        if let Some(handler) = async_handler {
            return Some(handler.handle_elicitation(request).await);
        }
        let handler = sync_handler?;
        Some(run_blocking(move || handler.handle_elicitation(request)).await)
    }

    /// Run the sampling handler, async form preferred.
    pub(crate) async fn handle_create_message(
        &self,
        request: CreateMessageRequest,
    ) -> Option<HandlerResult<CreateMessageResult>> {
        let (sync_handler, async_handler) = {
            let slots = self.slots.lock().expect("handler mutex poisoned");
            (slots.sampling.clone(), slots.async_sampling.clone())
        };
        if let Some(handler) = async_handler {
            return Some(handler.handle_create_message(request).await);
        }
        let handler = sync_handler?;
        Some(run_blocking(move || handler.handle_create_message(request)).await)
    }

    /// Run the roots handler, async form preferred.
    pub(crate) async fn list_roots(&self) -> Option<HandlerResult<Vec<Root>>> {
        let (sync_handler, async_handler) = {
            let slots = self.slots.lock().expect("handler mutex poisoned");
            (slots.roots.clone(), slots.async_roots.clone())
        };
        if let Some(handler) = async_handler {
            return Some(handler.list_roots().await);
        }
        let handler = sync_handler?;
        Some(run_blocking(move || handler.list_roots()).await)
    }
}

async fn run_blocking<T, F>(f: F) -> HandlerResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> HandlerResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(HandlerError::Generic {
            message: format!("handler task failed: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaymcp_protocol::types::ElicitationAction;
    use std::collections::HashMap;

    struct SyncAccept;
    impl ElicitationHandler for SyncAccept {
        fn handle_elicitation(&self, _request: ElicitRequest) -> HandlerResult<ElicitResult> {
            Ok(ElicitResult::accept(HashMap::new()))
        }
    }

    struct AsyncDecline;
    #[async_trait]
    impl AsyncElicitationHandler for AsyncDecline {
        async fn handle_elicitation(&self, _request: ElicitRequest) -> HandlerResult<ElicitResult> {
            Ok(ElicitResult::decline())
        }
    }

    fn form_request() -> ElicitRequest {
        serde_json::from_value(serde_json::json!({
            "message": "Name?",
            "requestedSchema": {"type": "object", "properties": {}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn no_handler_returns_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.handle_elicitation(form_request()).await.is_none());
        assert!(!registry.has_elicitation_handler());
    }

    #[tokio::test]
    async fn sync_handler_runs() {
        let registry = HandlerRegistry::new();
        registry.set_elicitation_handler(Arc::new(SyncAccept));
        let result = registry
            .handle_elicitation(form_request())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.action, ElicitationAction::Accept);
    }

    #[tokio::test]
    async fn async_handler_wins_over_sync() {
        let registry = HandlerRegistry::new();
        registry.set_elicitation_handler(Arc::new(SyncAccept));
        registry.set_async_elicitation_handler(Arc::new(AsyncDecline));
        let result = registry
            .handle_elicitation(form_request())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.action, ElicitationAction::Decline);
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(HandlerError::UserCancelled.into_jsonrpc_error().code, -32800);
        assert_eq!(
            HandlerError::Timeout { timeout_seconds: 5 }
                .into_jsonrpc_error()
                .code,
            -32801
        );
        assert_eq!(
            HandlerError::InvalidInput {
                details: "x".into()
            }
            .into_jsonrpc_error()
            .code,
            -32602
        );
        assert_eq!(HandlerError::Declined.into_jsonrpc_error().code, -32603);
    }
}
