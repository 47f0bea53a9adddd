// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Agreement
//!
//! Derives the symmetric key shared by a Provider and its Popup from one
//! side's secp256k1 secret key and the other side's public key. The raw
//! ECDH output is never used directly; it is expanded with HKDF-SHA256
//! into a 32-byte XChaCha20-Poly1305 key.

use hkdf::Hkdf;
use k256::{PublicKey, SecretKey};
use sha2::Sha256;

use super::error::CryptoError;

/// HKDF info string binding derived keys to this protocol
const SHARED_SECRET_INFO: &[u8] = b"fabstir-wallet-bridge/v1/shared-secret";

/// Derive a 32-byte shared encryption key
///
/// Both sides obtain the same key: `derive(a_secret, B_public) ==
/// derive(b_secret, A_public)`.
///
/// # Example
///
/// ```ignore
/// let key = derive_shared_key(&own_secret, &peer_public)?;
/// ```
pub fn derive_shared_key(
    own_secret: &SecretKey,
    peer_public: &PublicKey,
) -> Result<[u8; 32], CryptoError> {
    let shared_secret =
        k256::ecdh::diffie_hellman(own_secret.to_nonzero_scalar(), peer_public.as_affine());

    let hkdf = Hkdf::<Sha256>::new(None, shared_secret.raw_secret_bytes());
    let mut derived_key = [0u8; 32];
    hkdf.expand(SHARED_SECRET_INFO, &mut derived_key)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;

    Ok(derived_key)
}
