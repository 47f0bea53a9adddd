// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy shared by the Provider and the Popup
//!
//! - `codes`: numeric code tables (JSON-RPC, EIP-1193, EIP-3326, EIP-5792)
//! - `rpc`: `RpcError`, the wire `SerializedError` and the total serializer
//! - `bridge`: `BridgeError`, the Provider-facing error

pub mod bridge;
pub mod codes;
pub mod rpc;

pub use bridge::BridgeError;
pub use rpc::{serialize_error, serialize_value, LegacyError, RpcError, SerializedError};
