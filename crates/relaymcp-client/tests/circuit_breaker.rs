//! Circuit breaker behavior through the client facade.

mod support;

use std::time::Duration;

use relaymcp_client::{Client, ClientConfig, ClientError};
use relaymcp_transport::{CircuitBreakerConfig, CircuitState};
use support::MockTransport;

fn breaker_config() -> ClientConfig {
    ClientConfig {
        auto_initialize: false,
        enable_circuit_breaker: true,
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 1,
            recovery_timeout: Duration::from_millis(100),
            half_open_max_requests: 1,
        },
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn breaker_trips_blocks_and_recovers() {
    let transport = MockTransport::scripted();
    let client = Client::with_config(transport.clone(), breaker_config());
    client.connect().await.unwrap();

    // Three consecutive transport failures trip the circuit.
    transport.set_fail_sends(true);
    for _ in 0..3 {
        let result = client.send_request("ping", None).await;
        assert!(matches!(result, Err(ClientError::Transport(_))), "{result:?}");
    }
    assert_eq!(client.circuit_state(), CircuitState::Open);
    assert!(client.is_circuit_open());

    // The next request is rejected before touching the transport.
    let sends_before = transport.sent_count();
    let result = client.send_request("ping", None).await;
    assert!(matches!(result, Err(ClientError::CircuitOpen)), "{result:?}");
    assert_eq!(transport.sent_count(), sends_before);
    assert_eq!(client.circuit_stats().rejections, 1);

    // After the recovery timeout a single trial is admitted; its success
    // closes the circuit (success_threshold = 1).
    tokio::time::sleep(Duration::from_millis(150)).await;
    transport.set_fail_sends(false);
    client.send_request("ping", None).await.unwrap();
    assert_eq!(client.circuit_state(), CircuitState::Closed);

    client.disconnect().await;
}

#[tokio::test]
async fn rpc_errors_do_not_trip_the_breaker() {
    let transport = MockTransport::scripted();
    let client = Client::with_config(transport.clone(), breaker_config());
    client.connect().await.unwrap();

    // The scripted responder answers unknown methods with -32601; a
    // protocol-level failure is not a transport failure.
    for _ in 0..5 {
        let result = client.send_request("nonsense/method", None).await;
        assert!(matches!(result, Err(ClientError::Rpc { .. })), "{result:?}");
    }
    assert_eq!(client.circuit_state(), CircuitState::Closed);

    client.disconnect().await;
}

#[tokio::test]
async fn forced_open_and_closed() {
    let transport = MockTransport::scripted();
    let client = Client::with_config(transport.clone(), breaker_config());
    client.connect().await.unwrap();

    client.force_circuit_open();
    assert!(matches!(
        client.send_request("ping", None).await,
        Err(ClientError::CircuitOpen)
    ));

    client.force_circuit_closed();
    client.send_request("ping", None).await.unwrap();

    client.disconnect().await;
}

#[tokio::test]
async fn disabled_breaker_never_rejects() {
    let transport = MockTransport::scripted();
    let config = ClientConfig {
        enable_circuit_breaker: false,
        auto_initialize: false,
        ..ClientConfig::default()
    };
    let client = Client::with_config(transport.clone(), config);
    client.connect().await.unwrap();

    transport.set_fail_sends(true);
    for _ in 0..10 {
        let result = client.send_request("ping", None).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
    // Still no admission control.
    transport.set_fail_sends(false);
    client.send_request("ping", None).await.unwrap();

    client.disconnect().await;
}
