// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Encryption/Decryption
//!
//! Authenticated encryption for every payload that crosses the window
//! channel after the handshake. The 24-byte extended nonce makes random
//! nonces safe to use for the lifetime of one shared secret.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

use super::error::CryptoError;

/// XChaCha20 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Generate a fresh random nonce
///
/// **CRITICAL**: a nonce must never be reused under the same key. Every
/// call to [`encrypt_with_aead`] in this crate gets its own nonce from here.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt data using XChaCha20-Poly1305
///
/// Returns the ciphertext with the 16-byte authentication tag appended.
pub fn encrypt_with_aead(
    plaintext: &[u8],
    nonce: &[u8],
    key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected_size: NONCE_SIZE,
            actual_size: nonce.len(),
        });
    }

    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|e| {
        CryptoError::EncryptionFailed {
            reason: format!("failed to create cipher: {}", e),
        }
    })?;
    cipher
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: e.to_string(),
        })
}

/// Decrypt data using XChaCha20-Poly1305
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] if the authentication tag does
/// not verify, which covers both tampering and a key mismatch.
pub fn decrypt_with_aead(
    ciphertext: &[u8],
    nonce: &[u8],
    key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected_size: NONCE_SIZE,
            actual_size: nonce.len(),
        });
    }

    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|e| {
        CryptoError::DecryptionFailed {
            operation: "aead_decrypt".to_string(),
            reason: format!("failed to create cipher: {}", e),
        }
    })?;
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "aead_decrypt".to_string(),
            reason: format!("authentication error: {}", e),
        })
}
