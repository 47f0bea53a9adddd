// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Storage
//!
//! In-memory cache for hex-encoded key material. One instance backs one
//! [`KeyManager`](super::KeyManager) and lives no longer than the Provider
//! or Popup that owns it.
//!
//! **Security**: Values are held in memory only and never persisted.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory key-value cache for key material
///
/// Cloning yields a handle to the same map. Each Provider/Popup constructs
/// its own storage; handles are never shared between independent pairs.
///
/// # Example
///
/// ```ignore
/// let storage = KeyStorage::new();
/// storage.set("ownPublicKey", "02ab...").await;
/// let value = storage.get("ownPublicKey").await;
/// storage.clear().await;
/// ```
#[derive(Clone, Default)]
pub struct KeyStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl KeyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a cached value, `None` if absent
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    /// Store a value, replacing any previous one
    pub async fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        tracing::debug!("🔑 Key material cached under '{}'", key);
    }

    /// Drop every cached value
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        tracing::debug!("🗑️  Cleared key storage (count: {})", count);
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
