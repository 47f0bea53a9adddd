// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Numeric error code tables
//!
//! Mirrors the JSON-RPC 2.0 codes, EIP-1474 server codes, EIP-1193 provider
//! codes, EIP-3326 chain switching and EIP-5792 call batching codes so that
//! errors crossing the window channel stay meaningful to any dApp.

/// JSON-RPC 2.0 and EIP-1474 codes
pub mod rpc {
    pub const PARSE: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL: i64 = -32603;
    pub const INVALID_INPUT: i64 = -32000;
    pub const RESOURCE_NOT_FOUND: i64 = -32001;
    pub const RESOURCE_UNAVAILABLE: i64 = -32002;
    pub const TRANSACTION_REJECTED: i64 = -32003;
    pub const METHOD_NOT_SUPPORTED: i64 = -32004;
    pub const LIMIT_EXCEEDED: i64 = -32005;
}

/// EIP-1193 provider codes
pub mod provider {
    pub const USER_REJECTED_REQUEST: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
}

/// EIP-3326 `wallet_switchEthereumChain` codes
pub mod chain {
    pub const UNRECOGNIZED_CHAIN_ID: i64 = 4902;
}

/// EIP-5792 `wallet_sendCalls` family codes
pub mod batch {
    pub const UNSUPPORTED_CAPABILITY: i64 = 5700;
    pub const UNSUPPORTED_CHAIN_ID: i64 = 5710;
    pub const DUPLICATE_ID: i64 = 5720;
    pub const UNKNOWN_BUNDLE_ID: i64 = 5730;
    pub const BUNDLE_TOO_LARGE: i64 = 5740;
    pub const ATOMIC_UPGRADE_REJECTED: i64 = 5750;
    pub const ATOMICITY_NOT_SUPPORTED: i64 = 5760;
}

/// Message used when nothing better is known about an error
pub const FALLBACK_MESSAGE: &str = "Unspecified error message.";

/// Standard message for a known code
pub fn default_message(code: i64) -> Option<&'static str> {
    let message = match code {
        rpc::PARSE => "Invalid JSON was received by the server. An error occurred on the server while parsing the JSON text.",
        rpc::INVALID_REQUEST => "The JSON sent is not a valid Request object.",
        rpc::METHOD_NOT_FOUND => "The method does not exist / is not available.",
        rpc::INVALID_PARAMS => "Invalid method parameter(s).",
        rpc::INTERNAL => "Internal JSON-RPC error.",
        rpc::INVALID_INPUT => "Invalid input.",
        rpc::RESOURCE_NOT_FOUND => "Resource not found.",
        rpc::RESOURCE_UNAVAILABLE => "Resource unavailable.",
        rpc::TRANSACTION_REJECTED => "Transaction rejected.",
        rpc::METHOD_NOT_SUPPORTED => "Method not supported.",
        rpc::LIMIT_EXCEEDED => "Request limit exceeded.",
        provider::USER_REJECTED_REQUEST => "User rejected the request.",
        provider::UNAUTHORIZED => {
            "The requested account and/or method has not been authorized by the user."
        }
        provider::UNSUPPORTED_METHOD => {
            "The requested method is not supported by this Ethereum provider."
        }
        provider::DISCONNECTED => "The provider is disconnected from all chains.",
        provider::CHAIN_DISCONNECTED => "The provider is disconnected from the specified chain.",
        chain::UNRECOGNIZED_CHAIN_ID => "Unrecognized chain ID.",
        batch::UNSUPPORTED_CAPABILITY => "Wallet does not support a capability marked as required.",
        batch::UNSUPPORTED_CHAIN_ID => "Wallet does not support the requested chain ID.",
        batch::DUPLICATE_ID => "There is already a bundle submitted with this ID.",
        batch::UNKNOWN_BUNDLE_ID => "This bundle id is unknown / has not been submitted.",
        batch::BUNDLE_TOO_LARGE => "The call bundle is too large for the wallet to process.",
        batch::ATOMIC_UPGRADE_REJECTED => {
            "The user rejected the request to upgrade to an atomic-ready account."
        }
        batch::ATOMICITY_NOT_SUPPORTED => {
            "Wallet does not support atomic execution but the request requires it."
        }
        _ => return None,
    };
    Some(message)
}

/// Whether `code` belongs to one of the tables above
pub fn is_known_code(code: i64) -> bool {
    default_message(code).is_some()
}

/// Codes reserved by JSON-RPC for server implementations
pub fn is_server_error(code: i64) -> bool {
    (-32099..=-32000).contains(&code)
}
