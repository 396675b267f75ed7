//! Inbound message dispatcher.
//!
//! A single background task owns `transport.receive()` and routes every
//! inbound message: responses wake the pending-request awaiters,
//! notifications fan out to observers, and server-initiated requests run
//! their capability handlers under the handler timeout with exactly one
//! response per request id.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use relaymcp_protocol::jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};
use relaymcp_protocol::types::{ElicitRequest, ElicitResult, ListRootsResult, methods};
use relaymcp_transport::{Transport, TransportError};

use super::core::ClientInner;
use crate::error::{ClientError, ClientResult};

/// Spawn the routing task for a connected client.
pub(crate) fn spawn_dispatcher<T: Transport + 'static>(
    inner: Arc<ClientInner<T>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        debug!("message dispatcher started");
        loop {
            tokio::select! {
                _ = inner.shutdown.notified() => {
                    debug!("message dispatcher shutting down");
                    break;
                }
                result = inner.transport.receive() => match result {
                    Ok(value) => route_message(&inner, value).await,
                    Err(TransportError::Parse(e)) | Err(TransportError::Protocol(e)) => {
                        // Malformed traffic never terminates the
                        // transport; log, drop, continue.
                        warn!("dropping malformed inbound message: {e}");
                    }
                    Err(e) => {
                        error!("transport receive failed: {e}");
                        inner
                            .pending
                            .fail_all(ClientError::Transport(e.to_string()));
                        inner.mark_disconnected();
                        break;
                    }
                }
            }
        }
        debug!("message dispatcher terminated");
    })
}

/// Classify and route one inbound message.
async fn route_message<T: Transport + 'static>(inner: &Arc<ClientInner<T>>, value: Value) {
    let message = match JsonRpcMessage::classify(value) {
        Ok(message) => message,
        Err(e) => {
            warn!("dropping malformed inbound message: {e}");
            return;
        }
    };

    match message {
        JsonRpcMessage::Response(response) => route_response(inner, response),
        JsonRpcMessage::Notification(notification) => route_notification(inner, notification),
        JsonRpcMessage::Request(request) => {
            // Handlers run off the routing task so a slow handler never
            // stalls responses and notifications behind it.
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                handle_server_request(&inner, request).await;
            });
        }
    }
}

fn route_response<T: Transport + 'static>(inner: &ClientInner<T>, response: JsonRpcResponse) {
    let RequestId::Number(id) = &response.id else {
        warn!("dropping response with non-numeric id {:?}", response.id);
        return;
    };
    let id = *id;

    let result: ClientResult<Value> = match response.into_result() {
        Ok(value) => Ok(value),
        Err(error) => Err(ClientError::from_rpc(error)),
    };

    if !inner.pending.resolve(id, result) {
        // Late reply after timeout/cancellation, or an id we never
        // issued. Either way: log and drop, never double-resolve.
        warn!("dropping response for unknown or already-resolved request id {id}");
    }
}

fn route_notification<T: Transport + 'static>(
    inner: &ClientInner<T>,
    notification: JsonRpcNotification,
) {
    debug!("notification: {}", notification.method);
    inner
        .observers
        .route(&notification.method, notification.params.as_ref());
}

/// Run the handler for a server-initiated request and send exactly one
/// response for its id.
async fn handle_server_request<T: Transport + 'static>(
    inner: &ClientInner<T>,
    request: JsonRpcRequest,
) {
    let id = request.id.clone();
    let method = request.method.clone();
    debug!("server request: {method} (id {id})");

    // The handler future is dropped at the deadline, so a late handler
    // completion cannot produce a second response.
    let outcome = tokio::time::timeout(
        inner.config.handler_timeout,
        dispatch_by_method(inner, &method, request.params),
    )
    .await;

    let reply = match outcome {
        Ok(reply) => reply,
        Err(_elapsed) => {
            error!("handler for {method} exceeded {:?}", inner.config.handler_timeout);
            Err(JsonRpcError {
                code: JsonRpcErrorCode::InternalError.code(),
                message: format!(
                    "handler timed out after {} seconds",
                    inner.config.handler_timeout.as_secs()
                ),
                data: None,
            })
        }
    };

    let response = match reply {
        Ok(result) => JsonRpcResponse::success(result, id),
        Err(error) => JsonRpcResponse::error_response(error, id),
    };

    let encoded = match serde_json::to_value(&response) {
        Ok(encoded) => encoded,
        Err(e) => {
            error!("failed to encode response for {method}: {e}");
            return;
        }
    };
    if let Err(e) = inner.transport.send(encoded).await {
        error!("failed to send response for {method}: {e}");
    }
}

async fn dispatch_by_method<T: Transport + 'static>(
    inner: &ClientInner<T>,
    method: &str,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    match method {
        methods::ELICITATION_CREATE => handle_elicitation(inner, params).await,
        methods::SAMPLING_CREATE_MESSAGE => handle_sampling(inner, params).await,
        methods::ROOTS_LIST => handle_roots_list(inner).await,
        methods::PING => Ok(Value::Object(serde_json::Map::new())),
        other => Err(JsonRpcError {
            code: JsonRpcErrorCode::MethodNotFound.code(),
            message: format!("Method not found: {other}"),
            data: None,
        }),
    }
}

async fn handle_elicitation<T: Transport + 'static>(
    inner: &ClientInner<T>,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let request: ElicitRequest = parse_params(params)?;

    // Url-mode requests are vetted before any handler sees them; a
    // rejected URL declines without handler involvement.
    if let ElicitRequest::Url { url, .. } = &request
        && let Err(reason) = validate_elicitation_url(url, inner.config.require_https_elicitation)
    {
        warn!("declining url-mode elicitation: {reason}");
        return serde_json::to_value(ElicitResult::decline()).map_err(internal_error);
    }

    match inner.handlers.handle_elicitation(request).await {
        Some(Ok(result)) => serde_json::to_value(result).map_err(internal_error),
        Some(Err(e)) => Err(e.into_jsonrpc_error()),
        None => Err(JsonRpcError {
            code: JsonRpcErrorCode::MethodNotFound.code(),
            message: "Elicitation not supported: no handler registered".to_string(),
            data: None,
        }),
    }
}

async fn handle_sampling<T: Transport + 'static>(
    inner: &ClientInner<T>,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let request = parse_params(params)?;
    match inner.handlers.handle_create_message(request).await {
        Some(Ok(result)) => serde_json::to_value(result).map_err(internal_error),
        Some(Err(e)) => Err(e.into_jsonrpc_error()),
        None => Err(JsonRpcError {
            code: JsonRpcErrorCode::MethodNotFound.code(),
            message: "Sampling not supported: no handler registered".to_string(),
            data: None,
        }),
    }
}

async fn handle_roots_list<T: Transport + 'static>(
    inner: &ClientInner<T>,
) -> Result<Value, JsonRpcError> {
    match inner.handlers.list_roots().await {
        Some(Ok(roots)) => {
            serde_json::to_value(ListRootsResult { roots }).map_err(internal_error)
        }
        Some(Err(e)) => Err(e.into_jsonrpc_error()),
        None => Err(JsonRpcError {
            code: JsonRpcErrorCode::MethodNotFound.code(),
            message: "Roots not supported: no handler registered".to_string(),
            data: None,
        }),
    }
}

fn parse_params<P: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<P, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(|e| JsonRpcError {
        code: JsonRpcErrorCode::InvalidParams.code(),
        message: format!("Invalid params: {e}"),
        data: None,
    })
}

fn internal_error(e: serde_json::Error) -> JsonRpcError {
    JsonRpcError {
        code: JsonRpcErrorCode::InternalError.code(),
        message: format!("failed to serialize handler result: {e}"),
        data: None,
    }
}

/// Vet a url-mode elicitation target before the handler (and therefore
/// the user's browser) ever sees it.
///
/// Rejected: unparseable URLs, credentials in the authority, non-HTTPS
/// schemes (when policy demands), and hosts that are loopback,
/// link-local, or private-range addresses. Host names are checked
/// literally; `localhost` and `*.localhost` count as loopback.
pub(crate) fn validate_elicitation_url(raw: &str, require_https: bool) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| format!("unparseable URL: {e}"))?;

    if !url.username().is_empty() || url.password().is_some() {
        return Err("URL carries credentials in the authority".to_string());
    }

    match url.scheme() {
        "https" => {}
        "http" if !require_https => {}
        other => return Err(format!("scheme {other:?} is not allowed")),
    }

    match url.host() {
        None => return Err("URL has no host".to_string()),
        Some(url::Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return Err("host resolves to loopback".to_string());
            }
        }
        Some(url::Host::Ipv4(addr)) => {
            if addr.is_loopback() || addr.is_link_local() || addr.is_private() {
                return Err(format!("address {addr} is not publicly routable"));
            }
        }
        Some(url::Host::Ipv6(addr)) => {
            if addr.is_loopback() || is_ipv6_link_local(&addr) || is_ipv6_unique_local(&addr) {
                return Err(format!("address {addr} is not publicly routable"));
            }
            // IPv4-mapped addresses smuggle v4 ranges through v6 syntax.
            if let Some(mapped) = addr.to_ipv4_mapped()
                && (mapped.is_loopback() || mapped.is_link_local() || mapped.is_private())
            {
                return Err(format!("address {addr} maps to a private IPv4 range"));
            }
        }
    }

    Ok(())
}

fn is_ipv6_link_local(addr: &std::net::Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

fn is_ipv6_unique_local(addr: &std::net::Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_public_hosts_pass() {
        assert!(validate_elicitation_url("https://example.com/auth", true).is_ok());
        assert!(validate_elicitation_url("https://8.8.8.8/x", true).is_ok());
    }

    #[test]
    fn plain_http_is_policy_gated() {
        assert!(validate_elicitation_url("http://example.com/auth", true).is_err());
        assert!(validate_elicitation_url("http://example.com/auth", false).is_ok());
    }

    #[test]
    fn loopback_and_private_ranges_rejected() {
        for url in [
            "https://127.0.0.1/x",
            "https://localhost/x",
            "https://evil.localhost/x",
            "https://10.1.2.3/x",
            "https://172.16.0.1/x",
            "https://192.168.1.1/x",
            "https://169.254.1.1/x",
            "https://[::1]/x",
            "https://[fe80::1]/x",
            "https://[fd00::1]/x",
            "https://[::ffff:192.168.0.1]/x",
        ] {
            assert!(
                validate_elicitation_url(url, true).is_err(),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn credentials_rejected() {
        assert!(validate_elicitation_url("https://user:pw@example.com/x", true).is_err());
        assert!(validate_elicitation_url("https://user@example.com/x", true).is_err());
    }

    #[test]
    fn garbage_rejected() {
        assert!(validate_elicitation_url("not a url", true).is_err());
        assert!(validate_elicitation_url("file:///etc/passwd", true).is_err());
        assert!(validate_elicitation_url("javascript:alert(1)", true).is_err());
    }
}
