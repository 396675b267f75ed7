//! HTTP transport integration tests against a local mock server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relaymcp_transport::backoff::ConstantBackoff;
use relaymcp_transport::http::{HttpTransport, HttpTransportConfig};
use relaymcp_transport::{SessionState, Transport, TransportError};

fn config_for(server: &MockServer) -> HttpTransportConfig {
    HttpTransportConfig::new(server.uri())
        .with_endpoint_path("/mcp")
        .with_auto_open_sse_stream(false)
        .with_read_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn json_response_is_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();

    transport
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .unwrap();

    let received = transport.receive().await.unwrap();
    assert_eq!(received["id"], json!(1));
    assert_eq!(received["result"]["tools"], json!([]));

    transport.stop().await;
}

#[tokio::test]
async fn accepted_response_delivers_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();

    transport
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await
        .unwrap();

    // Nothing was queued; receive would hang, so poll with a short bound.
    let nothing =
        tokio::time::timeout(Duration::from_millis(200), transport.receive()).await;
    assert!(nothing.is_err(), "202 must not enqueue a message");

    transport.stop().await;
}

#[tokio::test]
async fn session_id_adopted_case_insensitively() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("SESSION-ID", "sess-1")
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();
    assert_eq!(transport.session_state(), SessionState::Connecting);

    transport
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
        .await
        .unwrap();

    assert_eq!(transport.session_id().as_deref(), Some("sess-1"));
    assert_eq!(transport.session_state(), SessionState::Connected);

    transport.stop().await;
    assert_eq!(transport.session_state(), SessionState::Disconnected);
    assert_eq!(transport.session_id(), None);
}

#[tokio::test]
async fn sse_response_to_post_is_parsed() {
    let server = MockServer::start().await;
    let body = "id: evt-1\ndata: {\"jsonrpc\":\"2.0\",\"id\":5,\"result\":{}}\n\n";
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/event-stream")
                .set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();

    transport
        .send(json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}))
        .await
        .unwrap();

    let received = transport.receive().await.unwrap();
    assert_eq!(received["id"], json!(5));
    assert_eq!(
        transport.session_manager().last_event_id().as_deref(),
        Some("evt-1")
    );

    transport.stop().await;
}

#[tokio::test]
async fn session_expiry_reinitializes_and_retries() {
    let server = MockServer::start().await;

    // First request establishes session s1.
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"id\":1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Session-Id", "s1")
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
        )
        .mount(&server)
        .await;

    // The next call on s1 is rejected: session expired.
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"id\":2"))
        .and(header("Session-Id", "s1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // The transport's own re-initialize obtains s2.
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("session-reinit"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Session-Id", "s2")
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": "session-reinit-0", "result": {}})),
        )
        .mount(&server)
        .await;

    // The original request is retried on s2 and succeeds.
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"id\":2"))
        .and(header("Session-Id", "s2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 2, "result": {"ok": true}})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();

    transport
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
        .await
        .unwrap();
    assert_eq!(transport.session_id().as_deref(), Some("s1"));
    let first = transport.receive().await.unwrap();
    assert_eq!(first["id"], json!(1));

    // One send call, one observed result, despite expiry in the middle.
    transport
        .send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await
        .unwrap();
    assert_eq!(transport.session_id().as_deref(), Some("s2"));

    let second = transport.receive().await.unwrap();
    assert_eq!(second["id"], json!(2));
    assert_eq!(second["result"]["ok"], json!(true));

    transport.stop().await;
}

#[tokio::test]
async fn first_post_404_is_plain_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();

    // No session was ever established, so 404 must not reconnect.
    let result = transport
        .send(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await;
    assert!(
        matches!(result, Err(TransportError::HttpStatus { status: 404, .. })),
        "{result:?}"
    );
    assert_ne!(transport.session_state(), SessionState::Reconnecting);

    transport.stop().await;
}

#[tokio::test]
async fn retryable_status_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 9, "result": {}})),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.backoff = Arc::new(ConstantBackoff::new(Duration::from_millis(10)));
    let transport = HttpTransport::new(config).unwrap();
    transport.start().await.unwrap();

    transport
        .send(json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}))
        .await
        .unwrap();
    let received = transport.receive().await.unwrap();
    assert_eq!(received["id"], json!(9));

    transport.stop().await;
}

#[tokio::test]
async fn retry_after_header_overrides_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 3, "result": {}})),
        )
        .mount(&server)
        .await;

    // A pathological backoff proves the header value was used instead.
    let mut config = config_for(&server);
    config.backoff = Arc::new(ConstantBackoff::new(Duration::from_secs(30)));
    let transport = HttpTransport::new(config).unwrap();
    transport.start().await.unwrap();

    let started = Instant::now();
    transport
        .send(json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}))
        .await
        .unwrap();
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "Retry-After: 0 was not honored"
    );

    transport.stop().await;
}

#[tokio::test]
async fn non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config_for(&server)).unwrap();
    transport.start().await.unwrap();

    let result = transport.send(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).await;
    assert!(matches!(
        result,
        Err(TransportError::HttpStatus { status: 400, .. })
    ));

    transport.stop().await;
}

#[tokio::test]
async fn oversized_body_rejected_locally() {
    let server = MockServer::start().await;
    // No mock mounted: the request must never reach the server.

    let mut config = config_for(&server);
    config.max_request_body_size = 32;
    let transport = HttpTransport::new(config).unwrap();
    transport.start().await.unwrap();

    let big = json!({"jsonrpc": "2.0", "id": 1, "method": "x", "params": {"blob": "a".repeat(64)}});
    let result = transport.send(big).await;
    assert!(matches!(
        result,
        Err(TransportError::MessageTooLarge { .. })
    ));

    transport.stop().await;
}

#[tokio::test]
async fn server_event_stream_delivers_and_records_event_ids() {
    let server = MockServer::start().await;

    let stream_body =
        "id: evt-42\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/tools/list_changed\"}\n\n";
    Mock::given(method("GET"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/event-stream")
                .set_body_raw(stream_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let config = config_for(&server).with_auto_open_sse_stream(true);
    let transport = HttpTransport::new(config).unwrap();
    transport.start().await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), transport.receive())
        .await
        .expect("server event should arrive")
        .unwrap();
    assert_eq!(received["method"], json!("notifications/tools/list_changed"));
    assert_eq!(
        transport.session_manager().last_event_id().as_deref(),
        Some("evt-42")
    );

    transport.stop().await;
}
