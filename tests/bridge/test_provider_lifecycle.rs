//! Provider Lifecycle Tests
//!
//! Local answers, call-status validation, disconnects and key rotation.

use super::common::*;
use ethers::types::H256;
use fabstir_wallet_bridge::protocol::{CallIdentifier, CallKind};
use fabstir_wallet_bridge::provider::{
    ClearAction, EventKind, ProviderEvent, RequestArguments, SessionPhase,
};
use fabstir_wallet_bridge::BridgeError;
use serde_json::{json, Value};

#[tokio::test]
async fn test_local_methods_never_open_popup() {
    let harness = BridgeHarness::new();
    let provider = &harness.provider;

    let chain = provider
        .request(RequestArguments::new("eth_chainId", Value::Null))
        .await
        .unwrap();
    assert_eq!(chain, json!("0x2105"));

    let version = provider
        .request(RequestArguments::new("net_version", Value::Null))
        .await
        .unwrap();
    assert_eq!(version, json!("8453"));

    let accounts = provider
        .request(RequestArguments::new("eth_accounts", Value::Null))
        .await
        .unwrap();
    assert_eq!(accounts, json!([]));

    assert_eq!(harness.opener.opened_count(), 0);
}

#[tokio::test]
async fn test_eth_accounts_reflects_connected_accounts() {
    let harness = BridgeHarness::new();
    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();

    let accounts = harness
        .provider
        .request(RequestArguments::new("eth_accounts", Value::Null))
        .await
        .unwrap();
    assert_eq!(accounts, serde_json::to_value(test_accounts()).unwrap());
    assert_eq!(harness.popup(0).stats().encrypted_requests, 1);
}

#[tokio::test]
async fn test_calls_status_rejects_malformed_identifier_locally() {
    let harness = BridgeHarness::new();

    let err = harness
        .provider
        .request(RequestArguments::new("wallet_getCallsStatus", json!(["0xdead"])))
        .await
        .unwrap_err();

    assert!(matches!(&err, BridgeError::Rpc(rpc) if rpc.code == -32602));
    assert_eq!(harness.opener.opened_count(), 0);
}

#[tokio::test]
async fn test_calls_status_forwards_valid_identifier() {
    let harness = BridgeHarness::new();
    let id = CallIdentifier::new(8453, CallKind::Operation, H256::repeat_byte(7)).encode();

    let result = harness
        .provider
        .request(RequestArguments::new("wallet_getCallsStatus", json!([id])))
        .await
        .unwrap();

    assert_eq!(result["method"], "wallet_getCallsStatus");
    assert_eq!(result["params"], json!([id]));
}

#[tokio::test]
async fn test_disconnect_clears_accounts_and_emits() {
    let harness = BridgeHarness::new();
    let disconnects = record_events(&harness.provider, EventKind::Disconnect);
    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();
    let key_before = harness
        .provider
        .key_manager()
        .get_own_public_key()
        .await
        .unwrap();

    harness.provider.disconnect().await;

    assert!(harness.provider.accounts().await.is_empty());
    let events = disconnects.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ProviderEvent::Disconnect(err) if err.code == 4900));

    // A dApp-initiated disconnect keeps key material
    let key_after = harness
        .provider
        .key_manager()
        .get_own_public_key()
        .await
        .unwrap();
    assert_eq!(key_before, key_after);
}

#[tokio::test]
async fn test_popup_unload_rotates_keys_and_reconnects() {
    let harness = BridgeHarness::new();
    let disconnects = record_events(&harness.provider, EventKind::Disconnect);
    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();
    let first_key = harness
        .provider
        .key_manager()
        .get_own_public_key()
        .await
        .unwrap();

    // Wallet window goes away between calls
    harness.popup(0).close().await;

    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();

    assert_eq!(disconnects.lock().unwrap().len(), 1);
    assert_eq!(harness.opener.opened_count(), 2);
    assert_eq!(harness.popup(1).stats().handshakes, 1);

    let second_key = harness
        .provider
        .key_manager()
        .get_own_public_key()
        .await
        .unwrap();
    assert_ne!(first_key, second_key, "New popup must get fresh key material");
    assert_eq!(harness.provider.accounts().await, test_accounts());
}

#[tokio::test]
async fn test_close_popup_is_a_disconnect() {
    let harness = BridgeHarness::new();
    assert!(!harness.provider.close_popup().await, "Nothing to close yet");

    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();
    assert!(harness.provider.close_popup().await);

    assert!(harness.provider.accounts().await.is_empty());
    assert_eq!(harness.provider.phase().await, SessionPhase::NoSharedSecret);
    assert!(!harness.provider.key_manager().has_peer().await);
}

#[tokio::test]
async fn test_clear_session_when_idle_is_immediate() {
    let harness = BridgeHarness::new();
    harness
        .provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .unwrap();

    assert_eq!(harness.provider.clear_session().await, ClearAction::Now);
    assert_eq!(harness.provider.phase().await, SessionPhase::NoSharedSecret);

    // Next call re-handshakes with the still-open popup
    harness
        .provider
        .request(RequestArguments::new("eth_blockNumber", json!([])))
        .await
        .unwrap();
    assert_eq!(harness.opener.opened_count(), 1);
    assert_eq!(harness.popup(0).stats().handshakes, 2);
}
