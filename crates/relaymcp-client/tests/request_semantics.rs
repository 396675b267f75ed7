//! Multiplexer semantics: timeouts, late replies, cancellation, and
//! concurrent traffic.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;

use relaymcp_client::{Client, ClientConfig, ClientError};
use support::MockTransport;

fn fast_timeout_config() -> ClientConfig {
    ClientConfig {
        request_timeout: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn request_times_out_and_late_reply_is_dropped() {
    let transport = MockTransport::scripted();
    let client = Client::with_config(transport.clone(), fast_timeout_config());
    client.connect().await.unwrap();

    // "slow" is never answered by the scripted responder.
    let result = client.send_request("slow", None).await;
    assert!(matches!(result, Err(ClientError::Timeout)), "{result:?}");

    // The server replies after the deadline; the reply must be dropped
    // without waking anything.
    let slow_id = transport
        .sent()
        .iter()
        .find(|m| m["method"] == json!("slow"))
        .and_then(|m| m["id"].as_u64())
        .expect("slow request was sent");
    transport.inject(json!({
        "jsonrpc": "2.0",
        "id": slow_id,
        "result": {"too": "late"}
    }));

    // The client keeps working and no awaiter was double-resolved.
    client.ping().await.unwrap();
    client.disconnect().await;
}

#[tokio::test]
async fn cancel_request_resolves_locally_and_notifies_server() {
    let transport = MockTransport::scripted();
    let config = ClientConfig {
        auto_initialize: false,
        ..ClientConfig::default()
    };
    let client = Arc::new(Client::with_config(transport.clone(), config));
    client.connect().await.unwrap();

    // First allocated id is 1.
    let in_flight = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.send_request("slow", None).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.cancel_request(1, Some("user gave up")).await.unwrap();

    // Local resolution does not wait for the server.
    let result = in_flight.await.unwrap();
    assert!(matches!(result, Err(ClientError::Cancelled)), "{result:?}");

    let cancel = transport
        .wait_for_sent(|m| m["method"] == json!("notifications/cancelled"))
        .await;
    assert_eq!(cancel["params"]["requestId"], json!(1));
    assert_eq!(cancel["params"]["reason"], json!("user gave up"));

    client.disconnect().await;
}

#[tokio::test]
async fn hundred_concurrent_requests_all_resolve() {
    let transport = MockTransport::scripted();
    let client = Client::new(transport.clone());
    client.connect().await.unwrap();

    let observed = Arc::new(AtomicUsize::new(0));
    {
        let observed = Arc::clone(&observed);
        client.on_tool_list_changed(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });
    }

    let mut futures = Vec::new();
    for _ in 0..100 {
        futures.push(client.list_tools(None));
    }

    // A notification lands while the requests are in flight.
    transport.inject(json!({
        "jsonrpc": "2.0",
        "method": "notifications/tools/list_changed"
    }));

    let results = join_all(futures).await;
    assert_eq!(results.len(), 100);
    for result in results {
        let tools = result.unwrap();
        assert_eq!(tools.tools.len(), 2);
    }

    // The observer fired exactly once.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(observed.load(Ordering::SeqCst), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn notification_observers_route_by_kind() {
    let transport = MockTransport::scripted();
    let client = Client::new(transport.clone());
    client.connect().await.unwrap();

    let updated_uris = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
    {
        let updated_uris = Arc::clone(&updated_uris);
        client.on_resource_updated(move |uri| {
            updated_uris.lock().unwrap().push(uri.to_string());
        });
    }
    let progress_count = Arc::new(AtomicUsize::new(0));
    {
        let progress_count = Arc::clone(&progress_count);
        client.on_progress(move |p| {
            assert!(p.progress >= 0.0);
            progress_count.fetch_add(1, Ordering::SeqCst);
        });
    }
    let generic_count = Arc::new(AtomicUsize::new(0));
    {
        let generic_count = Arc::clone(&generic_count);
        client.on_notification(move |_method, _params| {
            generic_count.fetch_add(1, Ordering::SeqCst);
        });
    }

    transport.inject(json!({
        "jsonrpc": "2.0",
        "method": "notifications/resources/updated",
        "params": {"uri": "file:///watched.txt"}
    }));
    transport.inject(json!({
        "jsonrpc": "2.0",
        "method": "notifications/progress",
        "params": {"progressToken": "tok", "progress": 0.5, "total": 1.0}
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*updated_uris.lock().unwrap(), vec!["file:///watched.txt"]);
    assert_eq!(progress_count.load(Ordering::SeqCst), 1);
    // The generic observer sees both.
    assert_eq!(generic_count.load(Ordering::SeqCst), 2);

    client.disconnect().await;
}

#[tokio::test]
async fn malformed_inbound_messages_are_dropped_silently() {
    let transport = MockTransport::scripted();
    let client = Client::new(transport.clone());
    client.connect().await.unwrap();

    // Neither of these is a valid protocol message.
    transport.inject(json!({"jsonrpc": "2.0"}));
    transport.inject(json!([1, 2, 3]));
    transport.inject(json!({"id": 999999}));

    // The dispatcher survives and ordinary traffic continues.
    client.ping().await.unwrap();
    client.disconnect().await;
}
