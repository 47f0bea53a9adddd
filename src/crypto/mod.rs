// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-End Encryption Module
//!
//! Cryptographic primitives that keep call contents confidential on the
//! cross-window channel:
//!
//! - **Key Storage**: in-memory cache for hex-encoded key material
//! - **Key Manager**: ephemeral secp256k1 key pair, peer key, shared secret
//! - **ECDH**: key agreement + HKDF-SHA256 expansion
//! - **Encryption**: XChaCha20-Poly1305 AEAD with random 24-byte nonces
//!
//! ## Security Considerations
//!
//! - Keys are ephemeral and never persisted
//! - Nonces are freshly random on every encryption
//! - `KeyManager::clear()` rotates all material after a popup disconnect

pub mod ecdh;
pub mod encryption;
pub mod error;
pub mod key_manager;
pub mod key_storage;

pub use ecdh::derive_shared_key;
pub use encryption::{decrypt_with_aead, encrypt_with_aead, generate_nonce, NONCE_SIZE};
pub use error::CryptoError;
pub use key_manager::{export_public_key, import_public_key, KeyManager, SharedSecret};
pub use key_storage::KeyStorage;
