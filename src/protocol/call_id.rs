// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Call-Identifier Codec
//!
//! A call identifier names a pending bundler operation or transaction so a
//! dApp can poll its status later (`wallet_getCallsStatus`) without the
//! wallet keeping a lookup table. Everything an indexer needs is inside it.
//!
//! ## Layout (64 bytes, `0x`-prefixed hex on the wire)
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 1    | kind (0 = operation, 1 = tx)  |
//! | 1      | 32   | hash                          |
//! | 33     | 8    | chain id, big-endian          |
//! | 41     | 23   | zero padding                  |

use ethers::types::H256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const CALL_ID_SIZE: usize = 64;

const KIND_OFFSET: usize = 0;
const HASH_OFFSET: usize = 1;
const CHAIN_ID_OFFSET: usize = 33;
const PADDING_OFFSET: usize = 41;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// Account-abstraction user operation
    Operation = 0,
    Transaction = 1,
}

impl TryFrom<u8> for CallKind {
    type Error = CallIdError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CallKind::Operation),
            1 => Ok(CallKind::Transaction),
            other => Err(CallIdError::UnknownKind(other)),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallIdError {
    #[error("Invalid call identifier hex: {0}")]
    InvalidHex(String),

    #[error("Invalid call identifier length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown call kind {0}")]
    UnknownKind(u8),

    #[error("Call identifier padding must be zero")]
    NonZeroPadding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallIdentifier {
    pub chain_id: u64,
    pub kind: CallKind,
    pub hash: H256,
}

impl CallIdentifier {
    pub fn new(chain_id: u64, kind: CallKind, hash: H256) -> Self {
        Self {
            chain_id,
            kind,
            hash,
        }
    }

    pub fn to_bytes(&self) -> [u8; CALL_ID_SIZE] {
        let mut bytes = [0u8; CALL_ID_SIZE];
        bytes[KIND_OFFSET] = self.kind as u8;
        bytes[HASH_OFFSET..CHAIN_ID_OFFSET].copy_from_slice(self.hash.as_bytes());
        bytes[CHAIN_ID_OFFSET..PADDING_OFFSET].copy_from_slice(&self.chain_id.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CallIdError> {
        if bytes.len() != CALL_ID_SIZE {
            return Err(CallIdError::InvalidLength {
                expected: CALL_ID_SIZE,
                actual: bytes.len(),
            });
        }

        if bytes[PADDING_OFFSET..].iter().any(|b| *b != 0) {
            return Err(CallIdError::NonZeroPadding);
        }

        let kind = CallKind::try_from(bytes[KIND_OFFSET])?;
        let hash = H256::from_slice(&bytes[HASH_OFFSET..CHAIN_ID_OFFSET]);

        let mut chain_id = [0u8; 8];
        chain_id.copy_from_slice(&bytes[CHAIN_ID_OFFSET..PADDING_OFFSET]);

        Ok(Self {
            chain_id: u64::from_be_bytes(chain_id),
            kind,
            hash,
        })
    }

    /// `0x`-prefixed lowercase hex of the 64-byte blob
    pub fn encode(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub fn decode(encoded: &str) -> Result<Self, CallIdError> {
        let stripped = encoded.strip_prefix("0x").unwrap_or(encoded);
        let bytes = hex::decode(stripped).map_err(|e| CallIdError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for CallIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CallIdentifier {
    type Err = CallIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
