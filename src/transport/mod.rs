// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-window transport
//!
//! Models `window.postMessage`: every post names an explicit target origin,
//! and every delivered message carries the sender's origin. The host
//! environment supplies implementations of [`MessageTarget`] and
//! [`PopupOpener`]; [`memory`] pairs windows inside one process.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

/// Target-origin argument of a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    /// `"*"`: deliver regardless of the receiver's origin
    Any,
    /// Deliver only if the receiver's origin matches exactly
    Exact(String),
}

impl TargetOrigin {
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            TargetOrigin::Any => true,
            TargetOrigin::Exact(expected) => expected == origin,
        }
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOrigin::Any => f.write_str("*"),
            TargetOrigin::Exact(origin) => f.write_str(origin),
        }
    }
}

/// A delivered message: sender origin plus structured-cloned data
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    pub origin: String,
    pub data: Value,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Window is closed")]
    Closed,

    #[error("Failed to open popup at {url}: {reason}")]
    OpenFailed { url: String, reason: String },
}

/// Handle to another window that messages can be posted to
#[async_trait]
pub trait MessageTarget: Send + Sync {
    fn post_message(&self, data: Value, target_origin: &TargetOrigin) -> Result<(), TransportError>;

    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Resolves once the window has been closed
    async fn closed(&self);
}

/// A popup opened by the Provider
pub struct PopupWindow {
    /// Origin of the popup document, derived from the URL it was opened at
    pub origin: String,
    pub target: Arc<dyn MessageTarget>,
    /// Messages posted by the popup to its opener
    pub inbound: UnboundedReceiver<WindowMessage>,
}

#[async_trait]
pub trait PopupOpener: Send + Sync {
    async fn open(&self, url: &Url) -> Result<PopupWindow, TransportError>;
}
