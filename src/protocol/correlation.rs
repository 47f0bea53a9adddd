// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Correlation Store
//!
//! Associates an in-flight logical call with the correlation id stamped on
//! every wire message it produces (the handshake and the encrypted request),
//! so an observer can group them. Entries are book-keeping only; the store
//! never owns the call.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct CorrelationStore<K> {
    entries: Arc<RwLock<HashMap<K, String>>>,
}

impl<K: Eq + Hash> CorrelationStore<K> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, call: &K) -> Option<String> {
        self.entries.read().await.get(call).cloned()
    }

    pub async fn set(&self, call: K, correlation_id: String) {
        self.entries.write().await.insert(call, correlation_id);
    }

    /// Remove the entry, returning the id it held
    pub async fn delete(&self, call: &K) -> Option<String> {
        self.entries.write().await.remove(call)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<K: Eq + Hash> Default for CorrelationStore<K> {
    fn default() -> Self {
        Self::new()
    }
}
