#![allow(dead_code)] // each test binary uses a different slice of the helpers

//! In-memory transport for end-to-end client tests.
//!
//! The transport records every outbound message, optionally fails sends
//! on demand, and answers requests through a scripted responder. Tests
//! keep a clone to inject server-initiated traffic and inspect what the
//! client wrote.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Mutex as TokioMutex, mpsc};

use relaymcp_transport::{Transport, TransportError, TransportResult};

type Responder = Box<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

struct Shared {
    running: AtomicBool,
    fail_sends: AtomicBool,
    sent: StdMutex<Vec<Value>>,
    responder: StdMutex<Option<Responder>>,
    inbound_tx: mpsc::UnboundedSender<Value>,
    inbound_rx: TokioMutex<mpsc::UnboundedReceiver<Value>>,
}

/// Clonable handle; all clones share the same channels and logs.
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("running", &self.shared.running.load(Ordering::Relaxed))
            .field("sent", &self.sent_count())
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                fail_sends: AtomicBool::new(false),
                sent: StdMutex::new(Vec::new()),
                responder: StdMutex::new(None),
                inbound_tx,
                inbound_rx: TokioMutex::new(inbound_rx),
            }),
        }
    }

    /// A transport scripted with the standard demo server: `initialize`,
    /// `ping`, `tools/list` with `echo` and `add`, and an echoing
    /// `tools/call`.
    pub fn scripted() -> Self {
        let transport = Self::new();
        transport.set_responder(default_responder);
        transport
    }

    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        *self.shared.responder.lock().unwrap() = Some(Box::new(responder));
    }

    /// Inject a server-initiated message.
    pub fn inject(&self, message: Value) {
        self.shared
            .inbound_tx
            .send(message)
            .expect("inbound channel closed");
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Value> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.shared.sent.lock().unwrap().len()
    }

    /// Wait until the client has written a message matching `predicate`.
    pub async fn wait_for_sent<F>(&self, predicate: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        for _ in 0..200 {
            if let Some(found) = self.sent().into_iter().find(|m| predicate(m)) {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected message was never sent; sent log: {:#?}", self.sent());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn start(&self) -> TransportResult<()> {
        self.shared.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }

    async fn send(&self, message: Value) -> TransportResult<()> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.shared.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionLost("injected failure".to_string()));
        }

        self.shared.sent.lock().unwrap().push(message.clone());

        let responses = {
            let responder = self.shared.responder.lock().unwrap();
            responder.as_ref().map(|r| r(&message)).unwrap_or_default()
        };
        for response in responses {
            let _ = self.shared.inbound_tx.send(response);
        }
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Value> {
        let mut rx = self.shared.inbound_rx.lock().await;
        rx.recv().await.ok_or(TransportError::Closed)
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// The standard demo responder.
pub fn default_responder(message: &Value) -> Vec<Value> {
    let Some(method) = message.get("method").and_then(Value::as_str) else {
        return Vec::new(); // a response from the client; nothing to answer
    };
    let Some(id) = message.get("id") else {
        return Vec::new(); // notification
    };

    match method {
        "initialize" => vec![json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {"listChanged": true}},
                "serverInfo": {"name": "everything", "version": "1.2.3"},
                "instructions": "echo and add are available"
            }
        })],
        "ping" => vec![json!({"jsonrpc": "2.0", "id": id, "result": {}})],
        "tools/list" => vec![json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "tools": [
                    {"name": "echo", "inputSchema": {"type": "object"}},
                    {"name": "add", "inputSchema": {"type": "object"}}
                ]
            }
        })],
        "tools/call" => {
            let name = message["params"]["name"].as_str().unwrap_or_default();
            if name == "echo" {
                let text = message["params"]["arguments"]["message"]
                    .as_str()
                    .unwrap_or_default();
                vec![json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {"content": [{"type": "text", "text": text}]}
                })]
            } else {
                vec![json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32602, "message": format!("unknown tool {name}")}
                })]
            }
        }
        "slow" => Vec::new(), // never answered
        _ => vec![json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": format!("Method not found: {method}")}
        })],
    }
}
