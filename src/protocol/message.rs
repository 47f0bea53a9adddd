// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire message types
//!
//! Everything posted across the window channel is one of:
//!
//! - a popup lifecycle event: `{event: "PopupLoaded" | "PopupUnload", id, timestamp}`
//! - a request: `{id, correlationId?, sender, content, timestamp}` where
//!   `content` is `{handshake: {method, params}}` or `{encrypted: {nonce, cipherText}}`
//! - a response: a request envelope plus `requestId`, with `content`
//!   `{encrypted: {...}}` or `{failure: {code, message, data?, stack?}}`
//!
//! Inbound data is classified once by [`WireMessage::classify`]; after that
//! the rest of the crate matches on typed enums only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::SerializedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopupEventKind {
    PopupLoaded,
    PopupUnload,
}

/// Lifecycle signal sent by the popup to its opener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupEvent {
    pub event: PopupEventKind,
    pub id: Uuid,
    pub timestamp: i64,
}

/// `{nonce, cipherText}`, both hex-encoded on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    #[serde(with = "hex::serde")]
    pub nonce: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub cipher_text: Vec<u8>,
}

/// Cleartext part of a handshake: which call triggered it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeContent {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestContent {
    Handshake(HandshakeContent),
    Encrypted(EncryptedPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseContent {
    Encrypted(EncryptedPayload),
    Failure(SerializedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Hex-encoded public key of the sending side
    pub sender: String,
    pub content: RequestContent,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub request_id: Uuid,
    pub sender: String,
    pub content: ResponseContent,
    pub timestamp: i64,
}

/// The call being made, as seen by the wallet handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAction {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Plaintext inside an encrypted request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub action: RequestAction,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallResult {
    Value(Value),
    Error(SerializedError),
}

/// Plaintext inside an encrypted response
///
/// `chain_id` is the wallet's current chain; the Provider refreshes its
/// cached chain id from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub result: CallResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Unknown popup event '{0}'")]
    UnknownEvent(String),

    #[error("Unrecognized message shape")]
    UnrecognizedShape,

    /// Envelope parsed but its content did not; carries enough to answer
    #[error("Malformed {kind} content in request {request_id}: {reason}")]
    MalformedContent {
        kind: &'static str,
        request_id: Uuid,
        correlation_id: Option<String>,
        reason: String,
    },

    #[error("Malformed {kind} envelope: {reason}")]
    MalformedEnvelope { kind: &'static str, reason: String },

    #[error("Failed to serialize message: {0}")]
    Serialization(String),
}

/// Request envelope with content left untyped for a second parsing step
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    id: Uuid,
    #[serde(default)]
    correlation_id: Option<String>,
    sender: String,
    content: Value,
    timestamp: i64,
}

/// Any message that can travel over the window channel
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Event(PopupEvent),
    Request(RpcRequest),
    Response(RpcResponse),
}

impl WireMessage {
    /// Classify raw inbound data
    ///
    /// Discriminators, checked in order: `event`, `requestId`, `content`.
    pub fn classify(data: &Value) -> Result<Self, ProtocolError> {
        let object = data.as_object().ok_or(ProtocolError::NotAnObject)?;

        if let Some(event) = object.get("event") {
            return serde_json::from_value::<PopupEvent>(data.clone())
                .map(WireMessage::Event)
                .map_err(|_| ProtocolError::UnknownEvent(event.to_string()));
        }

        if object.contains_key("requestId") {
            return serde_json::from_value::<RpcResponse>(data.clone())
                .map(WireMessage::Response)
                .map_err(|e| ProtocolError::MalformedEnvelope {
                    kind: "response",
                    reason: e.to_string(),
                });
        }

        if object.contains_key("content") {
            return Self::classify_request(data).map(WireMessage::Request);
        }

        Err(ProtocolError::UnrecognizedShape)
    }

    fn classify_request(data: &Value) -> Result<RpcRequest, ProtocolError> {
        let raw: RawRequest =
            serde_json::from_value(data.clone()).map_err(|e| ProtocolError::MalformedEnvelope {
                kind: "request",
                reason: e.to_string(),
            })?;

        let kind = match raw.content.as_object() {
            Some(content) if content.contains_key("handshake") => "handshake",
            Some(content) if content.contains_key("encrypted") => "encrypted",
            _ => return Err(ProtocolError::UnrecognizedShape),
        };

        let content = serde_json::from_value::<RequestContent>(raw.content).map_err(|e| {
            ProtocolError::MalformedContent {
                kind,
                request_id: raw.id,
                correlation_id: raw.correlation_id.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(RpcRequest {
            id: raw.id,
            correlation_id: raw.correlation_id,
            sender: raw.sender,
            content,
            timestamp: raw.timestamp,
        })
    }

    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        let value = match self {
            WireMessage::Event(event) => serde_json::to_value(event),
            WireMessage::Request(request) => serde_json::to_value(request),
            WireMessage::Response(response) => serde_json::to_value(response),
        };
        value.map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}
