// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider events
//!
//! Handlers run synchronously inside `emit`, in registration order. The
//! listener table is snapshotted before dispatch, so a handler may
//! register or remove listeners without deadlocking.

use ethers::types::Address;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::errors::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    ChainChanged,
    AccountsChanged,
    Message,
}

impl EventKind {
    /// EIP-1193 event name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::ChainChanged => "chainChanged",
            EventKind::AccountsChanged => "accountsChanged",
            EventKind::Message => "message",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Connect { chain_id: u64 },
    Disconnect(RpcError),
    ChainChanged(u64),
    AccountsChanged(Vec<Address>),
    /// Traffic from the popup that did not belong to the current call
    Message { kind: String, data: Value },
}

impl ProviderEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProviderEvent::Connect { .. } => EventKind::Connect,
            ProviderEvent::Disconnect(_) => EventKind::Disconnect,
            ProviderEvent::ChainChanged(_) => EventKind::ChainChanged,
            ProviderEvent::AccountsChanged(_) => EventKind::AccountsChanged,
            ProviderEvent::Message { .. } => EventKind::Message,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns whether a listener was removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        for handlers in listeners.values_mut() {
            if let Some(pos) = handlers.iter().position(|(existing, _)| *existing == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn emit(&self, event: &ProviderEvent) {
        let handlers: Vec<EventHandler> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            listeners
                .get(&event.kind())
                .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        tracing::debug!(
            "Emitting {} to {} listener(s)",
            event.kind().as_str(),
            handlers.len()
        );
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners.get(&kind).map(Vec::len).unwrap_or(0)
    }
}
