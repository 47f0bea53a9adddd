//! End-to-End Provider/Popup Tests
//!
//! A real Provider talking to real Popups over in-memory windows.

use super::common::*;
use fabstir_wallet_bridge::provider::{EventKind, ProviderEvent, RequestArguments, SessionPhase};
use fabstir_wallet_bridge::BridgeError;
use serde_json::{json, Value};

#[tokio::test]
async fn test_request_accounts_performs_one_handshake_and_one_call() {
    let harness = BridgeHarness::new();
    let accounts_events = record_events(&harness.provider, EventKind::AccountsChanged);

    let result = harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();

    let expected = test_accounts();
    assert_eq!(result, serde_json::to_value(&expected).unwrap());
    assert_eq!(harness.provider.accounts().await, expected);

    // Exactly one accounts event, carrying the same array
    let events = accounts_events.lock().unwrap().clone();
    assert_eq!(events, vec![ProviderEvent::AccountsChanged(expected)]);

    // One handshake round trip followed by one encrypted round trip
    let stats = harness.popup(0).stats();
    assert_eq!(stats.handshakes, 1);
    assert_eq!(stats.encrypted_requests, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(harness.opener.opened_count(), 1);

    assert_eq!(harness.provider.phase().await, SessionPhase::Ready);
    assert_eq!(harness.provider.in_flight_calls().await, 0);
    assert_eq!(harness.wallet.calls(), vec!["eth_requestAccounts"]);
}

#[tokio::test]
async fn test_later_calls_reuse_popup_and_secret() {
    let harness = BridgeHarness::new();
    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();

    let echoed = harness
        .provider
        .request(RequestArguments::new("eth_getBalance", json!(["0xabc", "latest"])))
        .await
        .unwrap();
    assert_eq!(echoed["method"], "eth_getBalance");
    assert_eq!(echoed["params"], json!(["0xabc", "latest"]));

    let stats = harness.popup(0).stats();
    assert_eq!(stats.handshakes, 1, "Shared secret must be reused");
    assert_eq!(stats.encrypted_requests, 2);
    assert_eq!(harness.opener.opened_count(), 1);
}

#[tokio::test]
async fn test_connect_event_only_on_first_accounts() {
    let harness = BridgeHarness::new();
    let connects = record_events(&harness.provider, EventKind::Connect);

    for _ in 0..2 {
        harness
            .provider
            .request(RequestArguments::new("eth_requestAccounts", json!([])))
            .await
            .unwrap();
    }

    let events = connects.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![ProviderEvent::Connect {
            chain_id: PROVIDER_CHAIN
        }]
    );
}

#[tokio::test]
async fn test_wallet_rejection_surfaces_as_rpc_error() {
    let harness = BridgeHarness::new();

    let err = harness
        .provider
        .request(RequestArguments::new("reject_me", Value::Null))
        .await
        .unwrap_err();

    match err {
        BridgeError::Rpc(rpc) => assert_eq!(rpc.code, 4001),
        other => panic!("Expected wallet rejection, got {:?}", other),
    }
    assert_eq!(harness.popup(0).stats().failures, 1);
    assert_eq!(harness.provider.in_flight_calls().await, 0);
}

#[tokio::test]
async fn test_wallet_failure_keeps_session_usable() {
    let harness = BridgeHarness::new();

    let err = harness
        .provider
        .request(RequestArguments::new("explode", Value::Null))
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32603);

    // Same popup, same secret, still answering
    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();
    assert_eq!(harness.opener.opened_count(), 1);
    assert_eq!(harness.popup(0).stats().handshakes, 1);
}

#[tokio::test]
async fn test_switch_chain_updates_both_sides() {
    let harness = BridgeHarness::new();
    let chain_events = record_events(&harness.provider, EventKind::ChainChanged);

    harness
        .provider
        .request(RequestArguments::new(
            "wallet_switchEthereumChain",
            json!([{ "chainId": "0xa" }]),
        ))
        .await
        .unwrap();

    assert_eq!(harness.popup(0).chain_id().await, 10);
    assert_eq!(harness.provider.chain_id().await, 10);
    assert_eq!(
        chain_events.lock().unwrap().clone(),
        vec![ProviderEvent::ChainChanged(10)]
    );

    let chain_hex = harness
        .provider
        .request(RequestArguments::new("eth_chainId", Value::Null))
        .await
        .unwrap();
    assert_eq!(chain_hex, json!("0xa"));
}

#[tokio::test]
async fn test_handshake_adopts_wallet_chain() {
    let harness = BridgeHarness::with_popup_chain(84532);
    let chain_events = record_events(&harness.provider, EventKind::ChainChanged);

    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();

    assert_eq!(harness.provider.chain_id().await, 84532);
    assert_eq!(
        chain_events.lock().unwrap().clone(),
        vec![ProviderEvent::ChainChanged(84532)]
    );
}
