// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process window pairs
//!
//! Two windows joined by unbounded tokio channels. Posts whose target
//! origin does not match the receiving window are dropped silently, the
//! same way a browser drops them. Used by the CLI demo and the tests.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use super::{MessageTarget, PopupOpener, PopupWindow, TargetOrigin, TransportError, WindowMessage};

/// Posting side of a channel between two windows
pub struct ChannelTarget {
    sender_origin: String,
    receiver_origin: String,
    tx: UnboundedSender<WindowMessage>,
    closed: Arc<watch::Sender<bool>>,
}

#[async_trait]
impl MessageTarget for ChannelTarget {
    fn post_message(&self, data: Value, target_origin: &TargetOrigin) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }

        if !target_origin.matches(&self.receiver_origin) {
            debug!(
                "Dropping message for {}: receiver origin is {}",
                target_origin, self.receiver_origin
            );
            return Ok(());
        }

        self.tx
            .send(WindowMessage {
                origin: self.sender_origin.clone(),
                data,
            })
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.tx.is_closed()
    }

    async fn closed(&self) {
        let mut flag = self.closed.subscribe();
        loop {
            let closed = *flag.borrow_and_update();
            if closed || flag.changed().await.is_err() {
                return;
            }
        }
    }
}

/// One window of a pair: a handle to the other window plus its own inbox
pub struct WindowEndpoint {
    pub origin: String,
    pub target: Arc<dyn MessageTarget>,
    pub inbound: UnboundedReceiver<WindowMessage>,
}

/// Join an opener window and a popup window
///
/// Returns `(opener, popup)`. Closing either target closes both
/// directions.
pub fn window_pair(opener_origin: &str, popup_origin: &str) -> (WindowEndpoint, WindowEndpoint) {
    let (closed, _) = watch::channel(false);
    let closed = Arc::new(closed);
    let (to_popup_tx, to_popup_rx) = mpsc::unbounded_channel();
    let (to_opener_tx, to_opener_rx) = mpsc::unbounded_channel();

    let opener = WindowEndpoint {
        origin: opener_origin.to_string(),
        target: Arc::new(ChannelTarget {
            sender_origin: opener_origin.to_string(),
            receiver_origin: popup_origin.to_string(),
            tx: to_popup_tx,
            closed: closed.clone(),
        }),
        inbound: to_opener_rx,
    };

    let popup = WindowEndpoint {
        origin: popup_origin.to_string(),
        target: Arc::new(ChannelTarget {
            sender_origin: popup_origin.to_string(),
            receiver_origin: opener_origin.to_string(),
            tx: to_opener_tx,
            closed,
        }),
        inbound: to_popup_rx,
    };

    (opener, popup)
}

/// Runs whatever should live inside a newly opened popup
pub type PopupLauncher = Arc<dyn Fn(WindowEndpoint) + Send + Sync>;

/// [`PopupOpener`] that builds an in-process window pair per `open`
pub struct InMemoryOpener {
    opener_origin: String,
    launcher: PopupLauncher,
    opened: AtomicUsize,
}

impl InMemoryOpener {
    pub fn new<F>(opener_origin: &str, launcher: F) -> Self
    where
        F: Fn(WindowEndpoint) + Send + Sync + 'static,
    {
        Self {
            opener_origin: opener_origin.to_string(),
            launcher: Arc::new(launcher),
            opened: AtomicUsize::new(0),
        }
    }

    /// Number of popups opened so far
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PopupOpener for InMemoryOpener {
    async fn open(&self, url: &Url) -> Result<PopupWindow, TransportError> {
        let popup_origin = url.origin().ascii_serialization();
        if popup_origin == "null" {
            return Err(TransportError::OpenFailed {
                url: url.to_string(),
                reason: "URL has an opaque origin".to_string(),
            });
        }

        let (opener, popup) = window_pair(&self.opener_origin, &popup_origin);
        (self.launcher)(popup);
        self.opened.fetch_add(1, Ordering::SeqCst);
        debug!("Opened in-memory popup at {}", url);

        Ok(PopupWindow {
            origin: popup_origin,
            target: opener.target,
            inbound: opener.inbound,
        })
    }
}
