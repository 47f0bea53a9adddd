// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Top-level error returned by `Provider::request`

use std::time::Duration;
use thiserror::Error;

use super::codes::{provider, rpc};
use super::rpc::RpcError;
use crate::crypto::CryptoError;
use crate::protocol::ProtocolError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Error reported by the wallet (deserialized `{failure}` or `{result:{error}}`)
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Popup went away before answering
    #[error("Popup closed before responding")]
    PopupClosed,

    /// Only raised when a response timeout is configured
    #[error("No response from popup within {0:?}")]
    Timeout(Duration),
}

impl BridgeError {
    /// Numeric code for callers that only render `{code, message}`
    pub fn code(&self) -> i64 {
        match self {
            BridgeError::Rpc(err) => err.code,
            BridgeError::Crypto(CryptoError::MissingSharedSecret) => provider::UNAUTHORIZED,
            BridgeError::Crypto(_) => rpc::INTERNAL,
            BridgeError::Transport(_) | BridgeError::PopupClosed => provider::DISCONNECTED,
            BridgeError::Protocol(_) => rpc::INVALID_REQUEST,
            BridgeError::Timeout(_) => rpc::RESOURCE_UNAVAILABLE,
        }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            BridgeError::Rpc(err) => err.clone(),
            other => RpcError::new(other.code(), other.to_string()),
        }
    }
}
