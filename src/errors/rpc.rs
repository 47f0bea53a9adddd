// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider RPC errors and the wire serializer
//!
//! [`serialize_error`] and [`serialize_value`] are the last boundary before
//! an error crosses the window channel. Both are total: every input maps to
//! a [`SerializedError`] and neither can panic.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use super::bridge::BridgeError;
use super::codes::{self, provider, rpc, FALLBACK_MESSAGE};

/// Error with an EIP-1193 / JSON-RPC numeric code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Error carrying the standard message for `code`
    pub fn from_code(code: i64) -> Self {
        Self::new(code, codes::default_message(code).unwrap_or(FALLBACK_MESSAGE))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(rpc::INTERNAL, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(rpc::INVALID_REQUEST, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(rpc::INVALID_PARAMS, message)
    }

    pub fn user_rejected() -> Self {
        Self::from_code(provider::USER_REJECTED_REQUEST)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(provider::UNAUTHORIZED, message)
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            provider::UNSUPPORTED_METHOD,
            format!("The method \"{}\" is not supported by this provider.", method),
        )
    }

    pub fn disconnected() -> Self {
        Self::from_code(provider::DISCONNECTED)
    }

    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            codes::chain::UNRECOGNIZED_CHAIN_ID,
            format!("Unrecognized chain ID \"{}\".", chain_id),
        )
    }
}

/// Wire-safe error shape carried by `{failure}` responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl SerializedError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: rpc::INTERNAL,
            message: message.into(),
            data: None,
            stack: None,
        }
    }

    fn unspecified() -> Self {
        Self::internal(FALLBACK_MESSAGE)
    }
}

impl From<&RpcError> for SerializedError {
    fn from(err: &RpcError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            data: err.data.clone(),
            stack: None,
        }
    }
}

impl From<SerializedError> for RpcError {
    fn from(err: SerializedError) -> Self {
        let message = if err.message.is_empty() {
            codes::default_message(err.code)
                .unwrap_or(FALLBACK_MESSAGE)
                .to_string()
        } else {
            err.message
        };
        Self {
            code: err.code,
            message,
            data: err.data,
        }
    }
}

/// Error shape reported by older wallet builds
///
/// These carry no reliable code; a "denied"/"rejected" message is treated
/// as a user rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyError {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    pub error_message: String,
}

impl fmt::Display for LegacyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.method, self.error_message)
    }
}

impl std::error::Error for LegacyError {}

fn serialize_legacy(err: &LegacyError) -> SerializedError {
    let code = err.error_code.unwrap_or_else(|| {
        let lowered = err.error_message.to_lowercase();
        if lowered.contains("denied") || lowered.contains("rejected") {
            provider::USER_REJECTED_REQUEST
        } else {
            rpc::INTERNAL
        }
    });

    SerializedError {
        code,
        message: non_empty_or_fallback(&err.error_message),
        data: Some(json!({ "method": err.method })),
        stack: None,
    }
}

fn non_empty_or_fallback(message: &str) -> String {
    if message.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// Convert any error raised while serving a request into its wire shape
///
/// - [`RpcError`] keeps its code, message and data
/// - [`LegacyError`] is reclassified by [`serialize_legacy`] rules
/// - a bare string message becomes `{code: internal, message}`
/// - anything else keeps its message, renders its cause chain as `stack`,
///   and gets code `internal`
pub fn serialize_error(err: &anyhow::Error) -> SerializedError {
    if let Some(rpc_err) = err.downcast_ref::<RpcError>() {
        return rpc_err.into();
    }
    if let Some(BridgeError::Rpc(rpc_err)) = err.downcast_ref::<BridgeError>() {
        return rpc_err.into();
    }
    if let Some(legacy) = err.downcast_ref::<LegacyError>() {
        return serialize_legacy(legacy);
    }

    let has_causes = err.chain().nth(1).is_some();
    if !has_causes {
        if let Some(message) = err.downcast_ref::<String>() {
            return SerializedError::internal(non_empty_or_fallback(message));
        }
        if let Some(message) = err.downcast_ref::<&'static str>() {
            return SerializedError::internal(non_empty_or_fallback(message));
        }
    }

    SerializedError {
        code: rpc::INTERNAL,
        message: non_empty_or_fallback(&err.to_string()),
        data: None,
        stack: Some(format!("{:?}", err)),
    }
}

/// Convert an untyped JSON value into its wire shape
pub fn serialize_value(value: &Value) -> SerializedError {
    match value {
        Value::String(message) => SerializedError::internal(non_empty_or_fallback(message)),
        Value::Object(map) => serialize_object(map),
        _ => SerializedError::unspecified(),
    }
}

fn serialize_object(map: &Map<String, Value>) -> SerializedError {
    let message = map.get("message").and_then(Value::as_str);
    let stack = map.get("stack").and_then(Value::as_str).map(str::to_string);

    if let (Some(Value::String(method)), Some(Value::String(error_message))) =
        (map.get("method"), map.get("errorMessage"))
    {
        let legacy = LegacyError {
            method: method.clone(),
            error_code: map.get("errorCode").and_then(Value::as_i64),
            error_message: error_message.clone(),
        };
        return serialize_legacy(&legacy);
    }

    if let (Some(code), Some(message)) = (map.get("code").and_then(Value::as_i64), message) {
        return SerializedError {
            code,
            message: non_empty_or_fallback(message),
            data: map.get("data").cloned(),
            stack,
        };
    }

    match message {
        Some(message) => SerializedError {
            code: rpc::INTERNAL,
            message: non_empty_or_fallback(message),
            data: None,
            stack,
        },
        None => SerializedError::unspecified(),
    }
}
