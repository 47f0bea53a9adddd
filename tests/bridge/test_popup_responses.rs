//! Popup Response Tests
//!
//! Every failure while serving a message becomes a `{failure}` reply and
//! the popup keeps serving later messages.

use super::common::*;
use fabstir_wallet_bridge::crypto::export_public_key;
use fabstir_wallet_bridge::popup::{IgnoreReason, MessageOutcome};
use fabstir_wallet_bridge::protocol::{CallResult, ResponseContent, WireMessage};
use serde_json::json;

#[tokio::test]
async fn test_handshake_ack_carries_chain_and_key() {
    let mut fixture = PopupFixture::new();
    let request = fixture.handshake_request().await;
    let request_id = request.id;

    let outcome = fixture.send(request).await;
    assert_eq!(outcome, MessageOutcome::HandshakeCompleted { request_id });

    let response = fixture.next_response().unwrap();
    assert_eq!(response.request_id, request_id);
    assert_eq!(response.correlation_id.as_deref(), Some("call-1"));

    let peer = fabstir_wallet_bridge::protocol::import_key_from_hex(&response.sender).unwrap();
    fixture.dapp_keys.set_peer_public_key(peer).await;
    let ack = fixture.decrypt_reply(&response).await;
    assert_eq!(ack.result, CallResult::Value(serde_json::Value::Null));
    assert_eq!(ack.chain_id, Some(PROVIDER_CHAIN));
}

#[tokio::test]
async fn test_encrypted_request_without_handshake_is_unauthorized() {
    let mut fixture = PopupFixture::new();

    // A dApp-side secret the popup never agreed to
    let stranger = fabstir_wallet_bridge::crypto::KeyManager::new();
    fixture
        .dapp_keys
        .set_peer_public_key(stranger.get_own_public_key().await.unwrap())
        .await;
    let request = fixture.encrypted_request("eth_accounts", json!([])).await;
    let request_id = request.id;

    let outcome = fixture.send(request).await;
    assert_eq!(
        outcome,
        MessageOutcome::FailureSent {
            request_id,
            code: 4100
        }
    );

    let response = fixture.next_response().unwrap();
    assert_eq!(response.request_id, request_id);
    assert!(!response.sender.is_empty(), "Failure replies carry identity");
    match response.content {
        ResponseContent::Failure(failure) => assert_eq!(failure.code, 4100),
        other => panic!("Expected failure, got {:?}", other),
    }
    assert!(fixture.wallet.calls().is_empty());
}

#[tokio::test]
async fn test_encrypted_request_dispatches_to_handler() {
    let mut fixture = PopupFixture::new();
    fixture.complete_handshake().await;

    let request = fixture
        .encrypted_request("eth_requestAccounts", json!([]))
        .await;
    let request_id = request.id;
    assert_eq!(
        fixture.send(request).await,
        MessageOutcome::Responded { request_id }
    );

    let response = fixture.next_response().unwrap();
    let reply = fixture.decrypt_reply(&response).await;
    assert_eq!(
        reply.result,
        CallResult::Value(serde_json::to_value(test_accounts()).unwrap())
    );
    assert_eq!(fixture.wallet.calls(), vec!["eth_requestAccounts"]);
}

#[tokio::test]
async fn test_handler_rejection_does_not_stop_popup() {
    let mut fixture = PopupFixture::new();
    fixture.complete_handshake().await;

    let rejected = fixture.encrypted_request("reject_me", json!([])).await;
    let rejected_id = rejected.id;
    assert_eq!(
        fixture.send(rejected).await,
        MessageOutcome::FailureSent {
            request_id: rejected_id,
            code: 4001
        }
    );
    let failure = fixture.next_response().unwrap();
    assert!(matches!(failure.content, ResponseContent::Failure(ref f) if f.code == 4001));

    let exploded = fixture.encrypted_request("explode", json!([])).await;
    assert!(matches!(
        fixture.send(exploded).await,
        MessageOutcome::FailureSent { code: -32603, .. }
    ));
    fixture.next_response().unwrap();

    let next = fixture.encrypted_request("eth_chainId", json!([])).await;
    assert!(matches!(
        fixture.send(next).await,
        MessageOutcome::Responded { .. }
    ));

    let stats = fixture.popup.stats();
    assert_eq!(stats.handshakes, 1);
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.encrypted_requests, 1);
}

#[tokio::test]
async fn test_malformed_handshake_is_invalid_request() {
    let mut fixture = PopupFixture::new();
    let own = fixture.dapp_keys.get_own_public_key().await.unwrap();
    let request_id = "00000000-0000-0000-0000-00000000000a";
    let malformed = json!({
        "id": request_id,
        "correlationId": "call-9",
        "sender": export_public_key(&own),
        "content": { "handshake": 5 },
        "timestamp": 0
    });

    let outcome = fixture
        .popup
        .handle_message(PopupFixture::message_from(DAPP_ORIGIN, malformed))
        .await;
    assert!(matches!(
        outcome,
        MessageOutcome::FailureSent { code: -32600, .. }
    ));

    let response = fixture.next_response().unwrap();
    assert_eq!(response.request_id.to_string(), request_id);
    assert_eq!(response.correlation_id.as_deref(), Some("call-9"));
}

#[tokio::test]
async fn test_bad_sender_key_becomes_failure() {
    let mut fixture = PopupFixture::new();
    let mut request = fixture.handshake_request().await;
    request.sender = "02deadbeef".to_string();

    let outcome = fixture.send(request).await;
    assert!(matches!(
        outcome,
        MessageOutcome::FailureSent { code: -32603, .. }
    ));
    assert!(fixture.next_response().is_some());
    assert_eq!(fixture.popup.parent_origin().await.as_deref(), Some(DAPP_ORIGIN));
}

#[tokio::test]
async fn test_failure_reply_dropped_when_parent_gone() {
    let fixture = PopupFixture::new();
    let stranger = fabstir_wallet_bridge::crypto::KeyManager::new();
    fixture
        .dapp_keys
        .set_peer_public_key(stranger.get_own_public_key().await.unwrap())
        .await;
    let request = fixture.encrypted_request("eth_accounts", json!([])).await;
    fixture.opener.target.close();

    let request_id = request.id;
    assert_eq!(
        fixture.send(request).await,
        MessageOutcome::ReplyDropped { request_id }
    );
}

#[tokio::test]
async fn test_close_announces_unload_and_wipes_keys() {
    let mut fixture = PopupFixture::new();
    fixture.complete_handshake().await;

    fixture.popup.close().await;

    let unload = fixture.opener.inbound.try_recv().unwrap();
    assert_eq!(unload.data["event"], "PopupUnload");

    let request = fixture.encrypted_request("eth_accounts", json!([])).await;
    assert_eq!(
        fixture.send(request).await,
        MessageOutcome::Ignored(IgnoreReason::Closed)
    );
}

#[tokio::test]
async fn test_switch_chain_is_adopted() {
    let mut fixture = PopupFixture::new();
    fixture.complete_handshake().await;

    let request = fixture
        .encrypted_request("wallet_switchEthereumChain", json!([{ "chainId": "0x89" }]))
        .await;
    fixture.send(request).await;

    assert_eq!(fixture.popup.chain_id().await, 137);
    let response = fixture.next_response().unwrap();
    let reply = fixture.decrypt_reply(&response).await;
    assert_eq!(reply.chain_id, Some(137));
}

#[tokio::test]
async fn test_switch_chain_rejects_decimal_chain_id() {
    let mut fixture = PopupFixture::new();
    fixture.complete_handshake().await;

    let request = fixture
        .encrypted_request("wallet_switchEthereumChain", json!([{ "chainId": "10" }]))
        .await;
    let request_id = request.id;
    let outcome = fixture.send(request).await;

    assert_eq!(
        outcome,
        MessageOutcome::FailureSent {
            request_id,
            code: -32602
        }
    );
    assert_eq!(fixture.popup.chain_id().await, PROVIDER_CHAIN);
    assert!(!fixture
        .wallet
        .calls()
        .contains(&"wallet_switchEthereumChain".to_string()));
    match fixture.next_response().unwrap().content {
        ResponseContent::Failure(failure) => assert_eq!(failure.code, -32602),
        other => panic!("Expected failure reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_response_messages_are_not_answered() {
    let mut fixture = PopupFixture::new();
    fixture.complete_handshake().await;

    let request = fixture.handshake_request().await;
    let own = fixture.dapp_keys.get_own_public_key().await.unwrap();
    let echo = fabstir_wallet_bridge::protocol::create_response(
        ResponseContent::Failure(fabstir_wallet_bridge::errors::SerializedError {
            code: 1,
            message: "x".to_string(),
            data: None,
            stack: None,
        }),
        &own,
        request.id,
        None,
    );
    let data = WireMessage::Response(echo).to_value().unwrap();
    let outcome = fixture
        .popup
        .handle_message(PopupFixture::message_from(DAPP_ORIGIN, data))
        .await;

    assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::NotARequest));
    assert!(fixture.next_response().is_none());
}
