//! Streamable HTTP client transport.
//!
//! Carries the protocol over a single endpoint URL: outbound messages go
//! out as POSTs, and a response is either an immediate JSON body, an SSE
//! stream of messages, or a bare `202 Accepted`. An optional long-lived
//! GET stream carries server-initiated messages and resumes after
//! disconnects via the last seen event id.
//!
//! Session identity lives in the owned [`SessionManager`]: the first
//! response carrying a `Session-Id` header establishes the session, the
//! header is echoed on every later request, a `404` on a session-carrying
//! request expires it, and the transport re-initializes once before
//! retrying the original message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tokio::sync::{Mutex as TokioMutex, mpsc};
use tracing::{debug, info, trace, warn};

use crate::error::{TransportError, TransportResult};
use crate::http::config::HttpTransportConfig;
use crate::http::sse::SseParser;
use crate::session::{SessionManager, SessionState};
use crate::traits::Transport;
use crate::validation::validate_endpoint_path;

/// Header naming the session on every request once established.
pub const SESSION_ID_HEADER: &str = "Session-Id";
/// Header carrying the resumption point on stream reconnects.
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-Id";

/// Case-insensitive response header lookup.
///
/// `HeaderMap` stores names lowercased, so lookups succeed for any input
/// casing; this helper funnels every read through one place.
pub fn get_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// A failed POST plus the server's pacing hint, when present.
struct PostFailure {
    error: TransportError,
    retry_after: Option<Duration>,
}

impl From<TransportError> for PostFailure {
    fn from(error: TransportError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// Streamable HTTP client transport
pub struct HttpTransport {
    config: HttpTransportConfig,
    endpoint_url: String,
    http_client: reqwest::Client,

    /// Session lifecycle, identity, and resumption state
    session: Arc<SessionManager>,

    running: Arc<AtomicBool>,

    /// Immediate POST responses; drained ahead of the SSE channel so the
    /// request/response pattern observes responses in POST order
    response_tx: mpsc::Sender<Value>,
    response_rx: Arc<TokioMutex<mpsc::Receiver<Value>>>,

    /// Server-initiated messages from the GET stream
    sse_tx: mpsc::Sender<Value>,
    sse_rx: Arc<TokioMutex<mpsc::Receiver<Value>>>,

    sse_task: Arc<TokioMutex<Option<tokio::task::JoinHandle<()>>>>,

    /// Ids for transport-issued initialize requests, outside the numeric
    /// id space the client multiplexer allocates from
    reinit_counter: AtomicU64,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint_url", &self.endpoint_url)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the base URL does not parse,
    /// the endpoint path fails traversal validation, or the TLS setup is
    /// unusable.
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let base = url::Url::parse(&config.base_url).map_err(|e| {
            TransportError::Configuration(format!("invalid base URL {:?}: {e}", config.base_url))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(TransportError::Configuration(format!(
                "unsupported URL scheme {:?}",
                base.scheme()
            )));
        }

        let path = validate_endpoint_path(&config.endpoint_path).ok_or_else(|| {
            TransportError::Configuration(format!(
                "endpoint path {:?} failed validation",
                config.endpoint_path
            ))
        })?;
        let endpoint_url = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            path
        );

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(config.connect_timeout);

        if !config.tls.validate_certificates {
            warn!(
                "TLS certificate validation is disabled; this is insecure and only \
                 acceptable against test servers"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        for cert_bytes in &config.tls.custom_ca_certs {
            let cert = reqwest::Certificate::from_pem(cert_bytes)
                .or_else(|_| reqwest::Certificate::from_der(cert_bytes))
                .map_err(|e| {
                    TransportError::Configuration(format!("unparseable CA certificate: {e}"))
                })?;
            builder = builder.add_root_certificate(cert);
        }

        let http_client = builder
            .build()
            .map_err(|e| TransportError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let (response_tx, response_rx) = mpsc::channel(256);
        let (sse_tx, sse_rx) = mpsc::channel(256);
        let session = Arc::new(SessionManager::new(config.session.clone()));

        Ok(Self {
            config,
            endpoint_url,
            http_client,
            session,
            running: Arc::new(AtomicBool::new(false)),
            response_tx,
            response_rx: Arc::new(TokioMutex::new(response_rx)),
            sse_tx,
            sse_rx: Arc::new(TokioMutex::new(sse_rx)),
            sse_task: Arc::new(TokioMutex::new(None)),
            reinit_counter: AtomicU64::new(0),
        })
    }

    /// The session manager owned by this transport.
    pub fn session_manager(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    /// Current session id, if the server issued one.
    pub fn session_id(&self) -> Option<String> {
        self.session.session_id()
    }

    /// Current session lifecycle state.
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    fn build_headers(&self, accept: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(accept) {
            headers.insert(header::ACCEPT, value);
        }
        for (name, value) in &self.config.default_headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(n, v);
            } else {
                warn!("skipping unrepresentable default header {name:?}");
            }
        }
        if let Some(session_id) = self.session.session_id()
            && let Ok(value) = HeaderValue::from_str(&session_id)
        {
            headers.insert(SESSION_ID_HEADER, value);
        }
        headers
    }

    /// Adopt a session id observed in a response header.
    fn observe_session_header(&self, headers: &HeaderMap) {
        if let Some(session_id) = get_header(headers, SESSION_ID_HEADER) {
            match self.session.state() {
                SessionState::Connecting | SessionState::Reconnecting => {
                    if self.session.established(session_id) {
                        info!("session established: {session_id}");
                    }
                }
                _ => {}
            }
        }
    }

    /// One POST attempt. Enqueues whatever inbound messages the response
    /// carries.
    async fn do_post(&self, message: &Value) -> Result<(), PostFailure> {
        let body = serde_json::to_vec(message)
            .map_err(|e| TransportError::Protocol(format!("failed to serialize message: {e}")))?;
        if self.config.max_request_body_size > 0 && body.len() > self.config.max_request_body_size {
            return Err(TransportError::MessageTooLarge {
                size: body.len(),
                max: self.config.max_request_body_size,
            }
            .into());
        }

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .headers(self.build_headers("application/json, text/event-stream"))
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.config.read_timeout)
            .body(body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let retry_after = get_header(response.headers(), "Retry-After")
            .and_then(crate::retry::parse_retry_after);

        if status.as_u16() == 404 {
            // A 404 only signals expiry once a session exists; before
            // that it is an ordinary HTTP error.
            return if self.session.session_id().is_some() {
                warn!("session no longer recognized by server (404)");
                self.session.session_expired();
                Err(TransportError::SessionExpired.into())
            } else {
                Err(PostFailure {
                    error: TransportError::HttpStatus {
                        status: 404,
                        message: "Not Found".to_string(),
                    },
                    retry_after,
                })
            };
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PostFailure {
                error: TransportError::HttpStatus {
                    status: status.as_u16(),
                    message: if message.is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("HTTP error")
                            .to_string()
                    } else {
                        message
                    },
                },
                retry_after,
            });
        }

        self.observe_session_header(response.headers());

        // 202 Accepted acknowledges a notification; nothing to deliver.
        if status == reqwest::StatusCode::ACCEPTED {
            trace!("202 Accepted");
            return Ok(());
        }

        let content_type = get_header(response.headers(), "Content-Type")
            .unwrap_or("")
            .to_string();

        if content_type.contains("application/json") {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
            if bytes.is_empty() {
                return Ok(());
            }
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|e| TransportError::Parse(format!("invalid JSON response: {e}")))?;
            self.response_tx
                .send(value)
                .await
                .map_err(|_| TransportError::Closed)?;
            Ok(())
        } else if content_type.contains("text/event-stream") {
            // Inline SSE response to the POST: every data event is an
            // inbound message, processed before send returns so ordering
            // against the next receive holds.
            let mut parser = SseParser::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
                for event in parser.push(&String::from_utf8_lossy(&chunk)) {
                    if let Some(id) = &event.id {
                        self.session.record_event_id(id);
                    }
                    if event.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(&event.data) {
                        Ok(value) => {
                            self.response_tx
                                .send(value)
                                .await
                                .map_err(|_| TransportError::Closed)?;
                        }
                        Err(e) => warn!("dropping unparseable SSE data: {e}"),
                    }
                }
            }
            Ok(())
        } else if content_type.is_empty() {
            // Some servers acknowledge notifications with a bare 200.
            Ok(())
        } else {
            Err(TransportError::InvalidResponse(format!(
                "unexpected content type {content_type:?}"
            ))
            .into())
        }
    }

    async fn do_post_with_retry(&self, message: &Value) -> TransportResult<()> {
        let mut attempt = 0usize;
        loop {
            match self.do_post(message).await {
                Ok(()) => {
                    self.config.backoff.reset();
                    return Ok(());
                }
                Err(failure) => {
                    if !self.config.retry.should_retry(&failure.error, attempt) {
                        return Err(failure.error);
                    }
                    // A server-supplied Retry-After overrides the
                    // computed backoff for this attempt.
                    let delay = failure
                        .retry_after
                        .unwrap_or_else(|| self.config.backoff.delay(attempt));
                    debug!(
                        "retrying after {delay:?} (attempt {attempt}): {}",
                        failure.error
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Re-establish an expired session: POST a fresh `initialize`, adopt
    /// the new session id, and discard the body. Runs at most once per
    /// `send`.
    async fn recover_session(&self) -> TransportResult<()> {
        let reinit_id = self.reinit_counter.fetch_add(1, Ordering::Relaxed);
        let initialize = json!({
            "jsonrpc": "2.0",
            "id": format!("session-reinit-{reinit_id}"),
            "method": "initialize",
            "params": {
                "protocolVersion": relaymcp_protocol::PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": self.config.client_name,
                    "version": self.config.client_version,
                },
            },
        });

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .headers(self.build_headers("application/json, text/event-stream"))
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.config.read_timeout)
            .body(
                serde_json::to_vec(&initialize)
                    .map_err(|e| TransportError::Protocol(e.to_string()))?,
            )
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            let message = format!("re-initialize failed: {}", response.status());
            self.session.connection_failed(&message);
            return Err(TransportError::ConnectionFailed(message));
        }

        self.observe_session_header(response.headers());
        if self.session.session_id().is_none() {
            let message = "re-initialize response carried no session id".to_string();
            self.session.connection_failed(&message);
            return Err(TransportError::InvalidResponse(message));
        }

        // The initialize response body belongs to the transport, not the
        // client; drain and drop it.
        let _ = response.bytes().await;
        info!("session re-established after expiry");
        Ok(())
    }

    /// Hold new sends while a reconnect is in flight elsewhere, bounded
    /// by the read timeout.
    async fn await_session_ready(&self) {
        if self.session.state() != SessionState::Reconnecting {
            return;
        }
        let deadline = Instant::now() + self.config.read_timeout;
        while self.session.state() == SessionState::Reconnecting && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn spawn_sse_stream(&self) -> tokio::task::JoinHandle<()> {
        let endpoint_url = self.endpoint_url.clone();
        let http_client = self.http_client.clone();
        let session = Arc::clone(&self.session);
        let running = Arc::clone(&self.running);
        let sse_tx = self.sse_tx.clone();
        let reconnect_delay = self.config.sse_reconnect_delay;
        let default_headers = self.config.default_headers.clone();

        tokio::spawn(async move {
            debug!("server-event stream task started");
            while running.load(Ordering::SeqCst) {
                let mut headers = HeaderMap::new();
                headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
                for (name, value) in &default_headers {
                    if let (Ok(n), Ok(v)) = (
                        HeaderName::from_bytes(name.as_bytes()),
                        HeaderValue::from_str(value),
                    ) {
                        headers.insert(n, v);
                    }
                }
                if let Some(session_id) = session.session_id()
                    && let Ok(value) = HeaderValue::from_str(&session_id)
                {
                    headers.insert(SESSION_ID_HEADER, value);
                }
                if let Some(last_event_id) = session.last_event_id()
                    && let Ok(value) = HeaderValue::from_str(&last_event_id)
                {
                    headers.insert(LAST_EVENT_ID_HEADER, value);
                }

                match http_client.get(&endpoint_url).headers(headers).send().await {
                    Ok(response) if response.status().is_success() => {
                        debug!("server-event stream connected");
                        let mut parser = SseParser::new();
                        let mut stream = response.bytes_stream();
                        while let Some(chunk) = stream.next().await {
                            let Ok(chunk) = chunk else { break };
                            for event in parser.push(&String::from_utf8_lossy(&chunk)) {
                                if let Some(id) = &event.id {
                                    session.record_event_id(id);
                                }
                                if event.is_empty() {
                                    continue;
                                }
                                match serde_json::from_str::<Value>(&event.data) {
                                    Ok(value) => {
                                        if sse_tx.send(value).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(e) => {
                                        warn!("dropping unparseable server event: {e}");
                                    }
                                }
                            }
                            if !running.load(Ordering::SeqCst) {
                                return;
                            }
                        }
                        debug!("server-event stream ended");
                    }
                    Ok(response) => {
                        warn!("server-event stream refused: {}", response.status());
                    }
                    Err(e) => {
                        warn!("server-event stream connect failed: {e}");
                    }
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(reconnect_delay).await;
            }
            debug!("server-event stream task stopped");
        })
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::ConnectionFailed(error.to_string())
    } else {
        TransportError::ConnectionLost(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&self) -> TransportResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("starting HTTP transport to {}", self.endpoint_url);
        self.session.begin_connect();

        // Drain anything left over from a previous run.
        while self.response_rx.lock().await.try_recv().is_ok() {}
        while self.sse_rx.lock().await.try_recv().is_ok() {}

        if self.config.auto_open_sse_stream {
            *self.sse_task.lock().await = Some(self.spawn_sse_stream());
        }
        Ok(())
    }

    async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping HTTP transport");

        if let Some(task) = self.sse_task.lock().await.take() {
            task.abort();
        }

        self.session.begin_close();
        if let Some(session_id) = self.session.session_id()
            && let Ok(value) = HeaderValue::from_str(&session_id)
        {
            let mut headers = HeaderMap::new();
            headers.insert(SESSION_ID_HEADER, value);
            if let Err(e) = self
                .http_client
                .delete(&self.endpoint_url)
                .headers(headers)
                .timeout(self.config.read_timeout)
                .send()
                .await
            {
                debug!("session DELETE failed (ignored): {e}");
            }
        }
        self.session.close_complete();
        if self.session.state() != SessionState::Disconnected {
            // Stop from a non-connected state still lands in Disconnected.
            self.session.reset();
        }
    }

    async fn send(&self, message: Value) -> TransportResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        self.await_session_ready().await;

        match self.do_post_with_retry(&message).await {
            Ok(()) => Ok(()),
            Err(TransportError::SessionExpired) => {
                // At most one automatic re-establishment per send.
                self.recover_session().await?;
                self.do_post_with_retry(&message).await
            }
            Err(e) => Err(e),
        }
    }

    async fn receive(&self) -> TransportResult<Value> {
        // Responses to POSTs take priority over server-initiated traffic.
        let mut response_rx = self.response_rx.lock().await;
        if let Ok(value) = response_rx.try_recv() {
            return Ok(value);
        }

        let mut sse_rx = self.sse_rx.lock().await;
        tokio::select! {
            biased;
            value = response_rx.recv() => value.ok_or(TransportError::Closed),
            value = sse_rx.recv() => value.ok_or(TransportError::Closed),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
