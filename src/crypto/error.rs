// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error type shared by key management, key agreement and payload
//! encryption.
//!
//! ## Error Variants
//!
//! - **DecryptionFailed**: AEAD decryption failed (wrong key, tampered ciphertext, auth tag mismatch)
//! - **EncryptionFailed**: AEAD encryption or payload serialization failed
//! - **InvalidKey**: key material could not be imported (wrong size, invalid point, bad hex)
//! - **InvalidNonce**: nonce size validation failed (XChaCha20 requires 24 bytes)
//! - **KeyDerivationFailed**: ECDH or HKDF derivation failed
//! - **InvalidPayload**: decrypted plaintext did not have the expected shape
//! - **MissingSharedSecret**: encrypt/decrypt attempted before a handshake completed
//!
//! An `InvalidKey` raised while reading cached key material is fatal for
//! the current session. Callers must run a new handshake; nothing in this
//! crate retries it.

use std::fmt;

/// Error type for all cryptographic operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD decryption failed
    ///
    /// This error occurs when:
    /// - Authentication tag verification fails (ciphertext tampered or wrong key)
    /// - Ciphertext is truncated
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// AEAD encryption failed
    EncryptionFailed {
        /// Specific failure reason
        reason: String,
    },

    /// Invalid cryptographic key
    InvalidKey {
        /// Type of key that failed (e.g., "peer_public_key", "own_public_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid nonce size
    InvalidNonce {
        expected_size: usize,
        actual_size: usize,
    },

    /// Key derivation failed (ECDH or HKDF)
    KeyDerivationFailed {
        operation: String,
        reason: String,
    },

    /// Decrypted payload could not be parsed
    InvalidPayload {
        field: String,
        reason: String,
    },

    /// No shared secret has been derived yet
    MissingSharedSecret,
}

impl CryptoError {
    pub fn invalid_key(key_type: &str, reason: impl fmt::Display) -> Self {
        CryptoError::InvalidKey {
            key_type: key_type.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::EncryptionFailed { reason } => {
                write!(f, "Encryption failed: {}", reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::InvalidNonce {
                expected_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Invalid nonce size: expected {} bytes, got {} bytes",
                    expected_size, actual_size
                )
            }
            CryptoError::KeyDerivationFailed { operation, reason } => {
                write!(f, "Key derivation failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
            CryptoError::MissingSharedSecret => {
                write!(f, "Shared secret not available: handshake has not completed")
            }
        }
    }
}

impl std::error::Error for CryptoError {}

// Conversion from hex decode errors
impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidKey {
            key_type: "hex_encoded_key".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

// Conversion from k256 errors (elliptic curve operations)
impl From<k256::elliptic_curve::Error> for CryptoError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "secp256k1_point".to_string(),
            reason: format!("k256 error: {}", err),
        }
    }
}
