//! Error Serializer Tests
//!
//! `serialize_error` and `serialize_value` are total: every input maps to a
//! `{code, message}` shape, unrecognized ones to the generic internal error.

use anyhow::{anyhow, Context};
use fabstir_wallet_bridge::crypto::CryptoError;
use fabstir_wallet_bridge::errors::codes::{self, FALLBACK_MESSAGE};
use fabstir_wallet_bridge::errors::{
    serialize_error, serialize_value, BridgeError, LegacyError, RpcError, SerializedError,
};
use serde_json::{json, Value};

#[test]
fn test_plain_string_becomes_internal() {
    let serialized = serialize_error(&anyhow!("wallet locked".to_string()));
    assert_eq!(serialized.code, codes::rpc::INTERNAL);
    assert_eq!(serialized.message, "wallet locked");
}

#[test]
fn test_legacy_denied_is_user_rejection() {
    let legacy = LegacyError {
        method: "eth_sendTransaction".to_string(),
        error_code: None,
        error_message: "User denied transaction signature".to_string(),
    };
    let serialized = serialize_error(&anyhow::Error::new(legacy));

    assert_eq!(serialized.code, codes::provider::USER_REJECTED_REQUEST);
    assert_eq!(serialized.data, Some(json!({ "method": "eth_sendTransaction" })));
}

#[test]
fn test_legacy_explicit_code_wins() {
    let legacy = LegacyError {
        method: "eth_sign".to_string(),
        error_code: Some(4200),
        error_message: "Request rejected: unsupported".to_string(),
    };
    let serialized = serialize_error(&anyhow::Error::new(legacy));
    assert_eq!(serialized.code, 4200);
}

#[test]
fn test_legacy_without_keywords_is_internal() {
    let legacy = LegacyError {
        method: "eth_call".to_string(),
        error_code: None,
        error_message: "execution reverted".to_string(),
    };
    let serialized = serialize_error(&anyhow::Error::new(legacy));
    assert_eq!(serialized.code, codes::rpc::INTERNAL);
}

#[test]
fn test_rpc_error_inside_bridge_error_keeps_code() {
    let err = anyhow::Error::new(BridgeError::Rpc(RpcError::unrecognized_chain(999)));
    let serialized = serialize_error(&err);
    assert_eq!(serialized.code, codes::chain::UNRECOGNIZED_CHAIN_ID);
}

#[test]
fn test_generic_error_keeps_message_and_stack() {
    let err = Err::<(), _>(CryptoError::MissingSharedSecret)
        .context("decrypting request")
        .unwrap_err();
    let serialized = serialize_error(&err);

    assert_eq!(serialized.code, codes::rpc::INTERNAL);
    assert_eq!(serialized.message, "decrypting request");
    let stack = serialized.stack.unwrap();
    assert!(stack.contains("decrypting request"));
}

#[test]
fn test_serialize_value_never_panics() {
    let inputs = vec![
        Value::Null,
        json!(42),
        json!(true),
        json!([1, 2, 3]),
        json!({}),
        json!({ "unexpected": "shape" }),
        json!({ "message": "" }),
        json!({ "code": "not-a-number", "message": "m" }),
        json!(""),
    ];

    for input in inputs {
        let serialized = serialize_value(&input);
        assert!(!serialized.message.is_empty(), "Empty message for {}", input);
    }
}

#[test]
fn test_unrecognized_value_uses_fallback() {
    let expected = SerializedError {
        code: codes::rpc::INTERNAL,
        message: FALLBACK_MESSAGE.to_string(),
        data: None,
        stack: None,
    };
    assert_eq!(serialize_value(&Value::Null), expected);
    assert_eq!(serialize_value(&json!({ "foo": 1 })), expected);
}

#[test]
fn test_serialize_value_reads_known_shapes() {
    let coded = serialize_value(&json!({ "code": 4902, "message": "Unknown chain", "data": 5 }));
    assert_eq!(coded.code, 4902);
    assert_eq!(coded.data, Some(json!(5)));

    let legacy = serialize_value(&json!({
        "method": "personal_sign",
        "errorMessage": "Request rejected by user"
    }));
    assert_eq!(legacy.code, 4001);

    let message_only = serialize_value(&json!({ "message": "boom", "stack": "at foo" }));
    assert_eq!(message_only.code, codes::rpc::INTERNAL);
    assert_eq!(message_only.stack.as_deref(), Some("at foo"));
}

#[test]
fn test_failure_deserializes_into_rpc_error() {
    let failure: SerializedError =
        serde_json::from_value(json!({ "code": 4100, "message": "" })).unwrap();
    let err: RpcError = failure.into();
    assert_eq!(err.code, 4100);
    assert!(!err.message.is_empty(), "Empty message gets the code default");
}
