// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-window RPC protocol
//!
//! - `message`: wire types and the one-time classification of inbound data
//! - `codec`: envelope builders and payload encryption
//! - `correlation`: correlation ids shared by the messages of one call
//! - `call_id`: self-describing identifiers for status polling

pub mod call_id;
pub mod codec;
pub mod correlation;
pub mod message;

pub use call_id::{CallIdError, CallIdentifier, CallKind, CALL_ID_SIZE};
pub use codec::{
    create_popup_event, create_request, create_response, decrypt_content, encrypt_content,
    export_key_to_hex, import_key_from_hex,
};
pub use correlation::CorrelationStore;
pub use message::{
    CallResult, EncryptedPayload, HandshakeContent, PopupEvent, PopupEventKind, ProtocolError,
    RequestAction, RequestContent, RequestPayload, ResponseContent, ResponsePayload, RpcRequest,
    RpcResponse, WireMessage,
};
