// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Popup Responder (wallet side)
//!
//! Runs inside the wallet popup. On construction it announces
//! `PopupLoaded` to its opener; then, per inbound message:
//!
//! 1. **Origin gate**: invalid or foreign origins are dropped with a warning
//! 2. **Dispatch**: handshake → key agreement; encrypted → wallet handler;
//!    anything else is ignored without a reply
//! 3. **Reply**: encrypted result, or a `{failure}` built by the error
//!    serializer
//!
//! Every message yields a [`MessageOutcome`], so silent drops are
//! observable. No error escapes [`Popup::handle_message`]; the listener
//! keeps running after any single bad message.

pub mod origin;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PopupConfig;
use crate::crypto::{CryptoError, KeyManager};
use crate::errors::{serialize_error, RpcError, SerializedError};
use crate::protocol::{
    create_popup_event, create_response, decrypt_content, encrypt_content, import_key_from_hex,
    CallResult, EncryptedPayload, HandshakeContent, PopupEventKind, ProtocolError,
    RequestContent, RequestPayload, ResponseContent, ResponsePayload, RpcRequest, RpcResponse,
    WireMessage,
};
use crate::transport::{MessageTarget, TargetOrigin, WindowMessage};
use origin::{OriginError, OriginGate};

/// The embedding wallet's own request logic
#[async_trait]
pub trait WalletRequestHandler: Send + Sync {
    async fn handle_request(&self, method: &str, params: Value) -> anyhow::Result<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreReason {
    InvalidOrigin(OriginError),
    /// Content was neither a handshake nor an encrypted request
    UnrecognizedShape,
    /// A well-formed message that a popup never answers (events, responses)
    NotARequest,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Ignored(IgnoreReason),
    HandshakeCompleted { request_id: Uuid },
    Responded { request_id: Uuid },
    FailureSent { request_id: Uuid, code: i64 },
    /// Building or posting the failure reply itself failed; the parent
    /// receives nothing
    ReplyDropped { request_id: Uuid },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopupStats {
    pub handshakes: u64,
    pub encrypted_requests: u64,
    pub failures: u64,
    pub ignored: u64,
}

#[derive(Default)]
struct StatCounters {
    handshakes: AtomicU64,
    encrypted_requests: AtomicU64,
    failures: AtomicU64,
    ignored: AtomicU64,
}

pub struct Popup {
    parent: Arc<dyn MessageTarget>,
    handler: Arc<dyn WalletRequestHandler>,
    keys: KeyManager,
    gate: Mutex<OriginGate>,
    chain_id: RwLock<u64>,
    /// Held for the whole handshake path; `close()` waits on it
    handshake_lock: Mutex<()>,
    closed: AtomicBool,
    stats: StatCounters,
}

impl Popup {
    /// Create the responder and announce readiness to the opener
    pub fn new(
        parent: Arc<dyn MessageTarget>,
        handler: Arc<dyn WalletRequestHandler>,
        config: PopupConfig,
    ) -> Arc<Self> {
        Self::with_keys(parent, handler, config, KeyManager::new())
    }

    pub fn with_keys(
        parent: Arc<dyn MessageTarget>,
        handler: Arc<dyn WalletRequestHandler>,
        config: PopupConfig,
        keys: KeyManager,
    ) -> Arc<Self> {
        let popup = Arc::new(Self {
            parent,
            handler,
            keys,
            gate: Mutex::new(OriginGate::new()),
            chain_id: RwLock::new(config.chain_id),
            handshake_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            stats: StatCounters::default(),
        });

        // The parent's origin is unknown until its first message arrives
        popup.announce(PopupEventKind::PopupLoaded, TargetOrigin::Any);
        popup
    }

    /// Spawn the inbound-message listener
    ///
    /// Each message is processed on its own task, so a slow wallet handler
    /// does not block later messages.
    pub fn listen(self: Arc<Self>, mut inbound: UnboundedReceiver<WindowMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let popup = self.clone();
                tokio::spawn(async move {
                    let outcome = popup.handle_message(message).await;
                    debug!("Popup message outcome: {:?}", outcome);
                });
            }
            debug!("Popup listener stopped: opener channel closed");
        })
    }

    pub async fn chain_id(&self) -> u64 {
        *self.chain_id.read().await
    }

    pub async fn parent_origin(&self) -> Option<String> {
        self.gate.lock().await.pinned().map(str::to_string)
    }

    pub fn stats(&self) -> PopupStats {
        PopupStats {
            handshakes: self.stats.handshakes.load(Ordering::SeqCst),
            encrypted_requests: self.stats.encrypted_requests.load(Ordering::SeqCst),
            failures: self.stats.failures.load(Ordering::SeqCst),
            ignored: self.stats.ignored.load(Ordering::SeqCst),
        }
    }

    /// Process one inbound message
    pub async fn handle_message(&self, message: WindowMessage) -> MessageOutcome {
        let outcome = self.dispatch(message).await;
        let counter = match &outcome {
            MessageOutcome::Ignored(_) => &self.stats.ignored,
            MessageOutcome::HandshakeCompleted { .. } => &self.stats.handshakes,
            MessageOutcome::Responded { .. } => &self.stats.encrypted_requests,
            MessageOutcome::FailureSent { .. } | MessageOutcome::ReplyDropped { .. } => {
                &self.stats.failures
            }
        };
        counter.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn dispatch(&self, message: WindowMessage) -> MessageOutcome {
        if self.closed.load(Ordering::SeqCst) {
            return MessageOutcome::Ignored(IgnoreReason::Closed);
        }

        let parent_origin = match self.gate.lock().await.admit(&message.origin) {
            Ok(origin) => origin.to_string(),
            Err(e) => {
                warn!("🚫 Ignoring message: {}", e);
                return MessageOutcome::Ignored(IgnoreReason::InvalidOrigin(e));
            }
        };

        let request = match WireMessage::classify(&message.data) {
            Ok(WireMessage::Request(request)) => request,
            Ok(_) => return MessageOutcome::Ignored(IgnoreReason::NotARequest),
            Err(ProtocolError::MalformedContent {
                kind,
                request_id,
                correlation_id,
                reason,
            }) => {
                let err = anyhow::Error::new(RpcError::invalid_request(format!(
                    "Malformed {} request: {}",
                    kind, reason
                )));
                return self
                    .send_failure(&parent_origin, request_id, correlation_id, &err)
                    .await;
            }
            Err(e) => {
                debug!("Ignoring unrecognized message from {}: {}", parent_origin, e);
                return MessageOutcome::Ignored(IgnoreReason::UnrecognizedShape);
            }
        };

        let request_id = request.id;
        let correlation_id = request.correlation_id.clone();
        let result = match &request.content {
            RequestContent::Handshake(handshake) => {
                self.handle_handshake(&parent_origin, &request, handshake).await
            }
            RequestContent::Encrypted(payload) => {
                self.handle_encrypted(&parent_origin, &request, payload).await
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.send_failure(&parent_origin, request_id, correlation_id, &err)
                    .await
            }
        }
    }

    async fn handle_handshake(
        &self,
        parent_origin: &str,
        request: &RpcRequest,
        handshake: &HandshakeContent,
    ) -> anyhow::Result<MessageOutcome> {
        let _guard = self.handshake_lock.lock().await;
        info!(
            "🤝 Handshake from {} (method: {})",
            parent_origin, handshake.method
        );

        let peer = import_key_from_hex(&request.sender)?;
        self.keys.set_peer_public_key(peer).await;
        let own = self.keys.get_own_public_key().await?;
        let secret = self
            .keys
            .get_shared_secret()
            .await?
            .ok_or(CryptoError::MissingSharedSecret)?;

        let acknowledgment = ResponsePayload {
            result: CallResult::Value(Value::Null),
            chain_id: Some(self.chain_id().await),
        };
        let encrypted = encrypt_content(&acknowledgment, &secret)?;
        let response = create_response(
            ResponseContent::Encrypted(encrypted),
            &own,
            request.id,
            request.correlation_id.clone(),
        );
        self.reply(parent_origin, response)?;

        Ok(MessageOutcome::HandshakeCompleted {
            request_id: request.id,
        })
    }

    async fn handle_encrypted(
        &self,
        parent_origin: &str,
        request: &RpcRequest,
        payload: &EncryptedPayload,
    ) -> anyhow::Result<MessageOutcome> {
        let secret = self.keys.get_shared_secret().await?.ok_or_else(|| {
            RpcError::unauthorized("Shared secret not derived; a handshake is required")
        })?;

        let decrypted: RequestPayload = decrypt_content(payload, &secret)?;
        self.reconcile_chain(decrypted.chain_id).await;

        let method = decrypted.action.method;
        let params = decrypted.action.params;
        let switch_to = if method == "wallet_switchEthereumChain" {
            Some(requested_chain_id(&params)?)
        } else {
            None
        };
        debug!("Dispatching {} to wallet handler", method);

        let value = self.handler.handle_request(&method, params).await?;

        if let Some(chain_id) = switch_to {
            self.reconcile_chain(chain_id).await;
        }

        let reply = ResponsePayload {
            result: CallResult::Value(value),
            chain_id: Some(self.chain_id().await),
        };
        let encrypted = encrypt_content(&reply, &secret)?;
        let own = self.keys.get_own_public_key().await?;
        let response = create_response(
            ResponseContent::Encrypted(encrypted),
            &own,
            request.id,
            request.correlation_id.clone(),
        );
        self.reply(parent_origin, response)?;

        Ok(MessageOutcome::Responded {
            request_id: request.id,
        })
    }

    async fn reconcile_chain(&self, chain_id: u64) {
        let mut current = self.chain_id.write().await;
        if *current != chain_id {
            info!("⛓️  Chain id {} -> {}", *current, chain_id);
            *current = chain_id;
        }
    }

    /// Reply with `{failure}`; if even that fails, log and give up
    async fn send_failure(
        &self,
        parent_origin: &str,
        request_id: Uuid,
        correlation_id: Option<String>,
        err: &anyhow::Error,
    ) -> MessageOutcome {
        let serialized = serialize_error(err);
        let code = serialized.code;
        warn!("Request {} failed: {} (code {})", request_id, serialized.message, code);

        match self
            .try_send_failure(parent_origin, request_id, correlation_id, serialized)
            .await
        {
            Ok(()) => MessageOutcome::FailureSent { request_id, code },
            Err(e) => {
                error!("❌ Could not deliver failure for request {}: {}", request_id, e);
                MessageOutcome::ReplyDropped { request_id }
            }
        }
    }

    async fn try_send_failure(
        &self,
        parent_origin: &str,
        request_id: Uuid,
        correlation_id: Option<String>,
        serialized: SerializedError,
    ) -> anyhow::Result<()> {
        let own = self.keys.get_own_public_key().await?;
        let response = create_response(
            ResponseContent::Failure(serialized),
            &own,
            request_id,
            correlation_id,
        );
        self.reply(parent_origin, response)
    }

    fn reply(&self, parent_origin: &str, response: RpcResponse) -> anyhow::Result<()> {
        let data = WireMessage::Response(response).to_value()?;
        self.parent
            .post_message(data, &TargetOrigin::Exact(parent_origin.to_string()))?;
        Ok(())
    }

    fn announce(&self, kind: PopupEventKind, target: TargetOrigin) {
        let event = WireMessage::Event(create_popup_event(kind));
        let posted = event
            .to_value()
            .map_err(anyhow::Error::from)
            .and_then(|data| self.parent.post_message(data, &target).map_err(anyhow::Error::from));
        if let Err(e) = posted {
            warn!("Failed to announce {:?}: {}", kind, e);
        }
    }

    /// Tear down: tell the opener and wipe key material
    ///
    /// Waits for an in-flight handshake to finish first, so a handshake
    /// never completes against cleared keys.
    pub async fn close(&self) {
        let _guard = self.handshake_lock.lock().await;
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let target = match self.parent_origin().await {
            Some(origin) => TargetOrigin::Exact(origin),
            None => TargetOrigin::Any,
        };
        self.announce(PopupEventKind::PopupUnload, target);
        self.keys.clear().await;
        info!("👋 Popup closed");
    }
}

/// `chainId` from `wallet_switchEthereumChain` params (`[{chainId: "0x..."}]`)
///
/// Only `0x`-prefixed hex quantities are accepted.
fn requested_chain_id(params: &Value) -> Result<u64, RpcError> {
    let raw = params
        .get(0)
        .and_then(|switch| switch.get("chainId"))
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("Expected [{ chainId: \"0x...\" }]"))?;
    raw.strip_prefix("0x")
        .filter(|digits| !digits.is_empty())
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .ok_or_else(|| {
            RpcError::invalid_params(format!("chainId must be a 0x-prefixed hex quantity, got {}", raw))
        })
}
