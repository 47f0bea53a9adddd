// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Message Codec
//!
//! Builds request/response envelopes, encrypts serializable payloads under
//! the shared secret, and marshals public keys for the `sender` field.
//! Decryption errors are returned unmodified so callers can turn them into
//! `{failure}` replies.

use k256::PublicKey;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::message::{
    EncryptedPayload, PopupEvent, PopupEventKind, RequestContent, ResponseContent, RpcRequest,
    RpcResponse,
};
use crate::crypto::{
    decrypt_with_aead, encrypt_with_aead, export_public_key, generate_nonce, import_public_key,
    CryptoError, SharedSecret,
};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build a request envelope with a fresh id
pub fn create_request(
    content: RequestContent,
    sender: &PublicKey,
    correlation_id: Option<String>,
) -> RpcRequest {
    RpcRequest {
        id: Uuid::new_v4(),
        correlation_id,
        sender: export_key_to_hex(sender),
        content,
        timestamp: now_millis(),
    }
}

/// Build a response envelope answering `request_id`
pub fn create_response(
    content: ResponseContent,
    sender: &PublicKey,
    request_id: Uuid,
    correlation_id: Option<String>,
) -> RpcResponse {
    RpcResponse {
        id: Uuid::new_v4(),
        correlation_id,
        request_id,
        sender: export_key_to_hex(sender),
        content,
        timestamp: now_millis(),
    }
}

pub fn create_popup_event(kind: PopupEventKind) -> PopupEvent {
    PopupEvent {
        event: kind,
        id: Uuid::new_v4(),
        timestamp: now_millis(),
    }
}

/// Serialize `payload` to JSON and encrypt it with a fresh nonce
pub fn encrypt_content<T: Serialize>(
    payload: &T,
    secret: &SharedSecret,
) -> Result<EncryptedPayload, CryptoError> {
    let plaintext = serde_json::to_vec(payload).map_err(|e| CryptoError::EncryptionFailed {
        reason: format!("payload serialization failed: {}", e),
    })?;

    let nonce = generate_nonce();
    let cipher_text = encrypt_with_aead(&plaintext, &nonce, secret.as_bytes())?;

    Ok(EncryptedPayload {
        nonce: nonce.to_vec(),
        cipher_text,
    })
}

/// Decrypt and parse an encrypted payload
///
/// # Errors
///
/// [`CryptoError::DecryptionFailed`] on tampering or a key mismatch,
/// [`CryptoError::InvalidPayload`] when the plaintext is not a `T`.
pub fn decrypt_content<T: DeserializeOwned>(
    payload: &EncryptedPayload,
    secret: &SharedSecret,
) -> Result<T, CryptoError> {
    let plaintext = decrypt_with_aead(&payload.cipher_text, &payload.nonce, secret.as_bytes())?;

    serde_json::from_slice(&plaintext).map_err(|e| CryptoError::InvalidPayload {
        field: "plaintext".to_string(),
        reason: e.to_string(),
    })
}

pub fn export_key_to_hex(key: &PublicKey) -> String {
    export_public_key(key)
}

/// Import the public key carried in a message's `sender` field
pub fn import_key_from_hex(encoded: &str) -> Result<PublicKey, CryptoError> {
    import_public_key(encoded, "sender_public_key")
}
