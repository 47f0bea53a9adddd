// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Manager
//!
//! Owns one side's ephemeral secp256k1 key pair, the peer's public key,
//! and the shared secret derived from the two. The secret half of the
//! key pair never leaves this struct; only the public half is exported
//! (hex-encoded, cached in [`KeyStorage`]).
//!
//! ## Lifecycle
//!
//! 1. `get_own_public_key()` lazily generates the key pair
//! 2. `set_peer_public_key()` records the other side's key after a handshake
//! 3. `get_shared_secret()` derives (and caches) the symmetric key
//! 4. `clear()` wipes everything so the next handshake uses fresh keys

use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ecdh::derive_shared_key;
use super::error::CryptoError;
use super::key_storage::KeyStorage;

/// Storage slot for this side's exported public key
pub const OWN_PUBLIC_KEY: &str = "ownPublicKey";
/// Storage slot for the peer's exported public key
pub const PEER_PUBLIC_KEY: &str = "peerPublicKey";

/// 32-byte symmetric key shared by a Provider and its Popup
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for SharedSecret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Encode a public key as lowercase hex of its compressed SEC1 form
pub fn export_public_key(key: &PublicKey) -> String {
    hex::encode(key.to_encoded_point(true).as_bytes())
}

/// Parse a hex-encoded SEC1 public key (compressed or uncompressed,
/// optional `0x` prefix)
pub fn import_public_key(encoded: &str, key_type: &str) -> Result<PublicKey, CryptoError> {
    let stripped = encoded.strip_prefix("0x").unwrap_or(encoded);
    let bytes = hex::decode(stripped).map_err(|e| CryptoError::invalid_key(key_type, e))?;

    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(CryptoError::invalid_key(
            key_type,
            format!("expected 33 or 65 bytes, got {}", bytes.len()),
        ));
    }

    PublicKey::from_sec1_bytes(&bytes).map_err(|e| CryptoError::invalid_key(key_type, e))
}

#[derive(Default)]
struct KeyState {
    own_secret: Option<SecretKey>,
    peer_public: Option<PublicKey>,
    shared_secret: Option<SharedSecret>,
}

/// Ephemeral key material for one Provider or Popup instance
pub struct KeyManager {
    storage: KeyStorage,
    state: Mutex<KeyState>,
}

impl KeyManager {
    pub fn new() -> Self {
        Self::with_storage(KeyStorage::new())
    }

    /// Build a manager on top of an explicit storage instance
    pub fn with_storage(storage: KeyStorage) -> Self {
        Self {
            storage,
            state: Mutex::new(KeyState::default()),
        }
    }

    /// Return this side's public key, generating a key pair on first use
    ///
    /// Idempotent until [`clear`](Self::clear). The returned key is
    /// re-imported from the hex cache, so corrupted cached material
    /// surfaces here as [`CryptoError::InvalidKey`].
    pub async fn get_own_public_key(&self) -> Result<PublicKey, CryptoError> {
        let mut state = self.state.lock().await;

        let secret = match &state.own_secret {
            Some(secret) => secret.clone(),
            None => {
                let secret = SecretKey::random(&mut OsRng);
                let exported = export_public_key(&secret.public_key());
                self.storage.set(OWN_PUBLIC_KEY, exported).await;
                info!("🔑 Generated ephemeral key pair");
                state.own_secret = Some(secret.clone());
                secret
            }
        };

        match self.storage.get(OWN_PUBLIC_KEY).await {
            Some(cached) => import_public_key(&cached, "own_public_key"),
            None => {
                let public = secret.public_key();
                self.storage
                    .set(OWN_PUBLIC_KEY, export_public_key(&public))
                    .await;
                Ok(public)
            }
        }
    }

    /// Record the peer's public key and drop any cached shared secret
    pub async fn set_peer_public_key(&self, peer: PublicKey) {
        let mut state = self.state.lock().await;
        self.storage
            .set(PEER_PUBLIC_KEY, export_public_key(&peer))
            .await;
        state.peer_public = Some(peer);
        state.shared_secret = None;
        debug!("Peer public key registered, shared secret invalidated");
    }

    /// Return the shared secret, or `None` while either half is missing
    pub async fn get_shared_secret(&self) -> Result<Option<SharedSecret>, CryptoError> {
        let mut state = self.state.lock().await;

        if let Some(secret) = &state.shared_secret {
            return Ok(Some(secret.clone()));
        }

        let (own, peer) = match (&state.own_secret, &state.peer_public) {
            (Some(own), Some(peer)) => (own, peer),
            _ => return Ok(None),
        };

        let derived = SharedSecret(derive_shared_key(own, peer)?);
        state.shared_secret = Some(derived.clone());
        debug!("Shared secret derived");
        Ok(Some(derived))
    }

    /// Whether a peer key has been registered
    pub async fn has_peer(&self) -> bool {
        self.state.lock().await.peer_public.is_some()
    }

    /// Discard the key pair, the peer key and the shared secret
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = KeyState::default();
        self.storage.clear().await;
        info!("🗑️  Key material cleared");
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}
