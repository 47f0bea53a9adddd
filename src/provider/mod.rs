// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider Orchestrator (dApp side)
//!
//! Exposes an EIP-1193 style `request` API backed by a wallet popup.
//! A call goes through these steps:
//!
//! 1. Methods answerable from local state (`eth_chainId`, `net_version`,
//!    `eth_accounts`) return immediately
//! 2. The popup is opened if needed and the Provider waits for `PopupLoaded`
//! 3. Without a shared secret, a handshake round trip runs first
//! 4. The call is encrypted, sent, and matched to its reply by `requestId`
//!
//! At most one logical call is in flight per Provider; `request` holds an
//! async mutex for the whole round trip.

pub mod events;
pub mod session;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::crypto::{CryptoError, KeyManager};
use crate::errors::{BridgeError, RpcError};
use crate::protocol::{
    create_request, decrypt_content, encrypt_content, import_key_from_hex, CallIdentifier,
    CallResult, CorrelationStore, EncryptedPayload, HandshakeContent, PopupEventKind,
    RequestAction, RequestContent, RequestPayload, ResponseContent, ResponsePayload, RpcRequest,
    RpcResponse, WireMessage,
};
use crate::transport::{MessageTarget, PopupOpener, TargetOrigin, TransportError, WindowMessage};
pub use events::{EventEmitter, EventKind, ListenerId, ProviderEvent};
pub use session::{ClearAction, SessionPhase, SessionState};

/// Arguments of one `request` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Identity of one logical call, used to key the correlation store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CallTicket(u64);

struct PopupConnection {
    origin: String,
    target: Arc<dyn MessageTarget>,
    inbound: tokio::sync::mpsc::UnboundedReceiver<WindowMessage>,
}

impl PopupConnection {
    /// Next message from the popup; `None` once the window is gone
    async fn next_message(&mut self) -> Option<WindowMessage> {
        tokio::select! {
            message = self.inbound.recv() => message,
            _ = self.target.closed() => None,
        }
    }
}

/// What an inbound message means to the Provider
enum Inbound {
    Foreign(String),
    Loaded,
    Unloaded,
    Response(RpcResponse),
    Unrecognized,
}

fn inspect(expected_origin: &str, message: &WindowMessage) -> Inbound {
    if message.origin != expected_origin {
        return Inbound::Foreign(message.origin.clone());
    }
    match WireMessage::classify(&message.data) {
        Ok(WireMessage::Event(event)) => match event.event {
            PopupEventKind::PopupLoaded => Inbound::Loaded,
            PopupEventKind::PopupUnload => Inbound::Unloaded,
        },
        Ok(WireMessage::Response(response)) => Inbound::Response(response),
        Ok(WireMessage::Request(_)) | Err(_) => Inbound::Unrecognized,
    }
}

pub struct Provider {
    config: ProviderConfig,
    opener: Arc<dyn PopupOpener>,
    keys: KeyManager,
    correlations: CorrelationStore<CallTicket>,
    events: EventEmitter,
    session: Mutex<SessionState>,
    popup: Mutex<Option<PopupConnection>>,
    accounts: RwLock<Vec<Address>>,
    chain_id: RwLock<u64>,
    call_lock: Mutex<()>,
    next_ticket: AtomicU64,
}

impl Provider {
    pub fn new(config: ProviderConfig, opener: Arc<dyn PopupOpener>) -> Self {
        Self::with_keys(config, opener, KeyManager::new())
    }

    pub fn with_keys(config: ProviderConfig, opener: Arc<dyn PopupOpener>, keys: KeyManager) -> Self {
        let chain_id = config.default_chain_id;
        Self {
            config,
            opener,
            keys,
            correlations: CorrelationStore::new(),
            events: EventEmitter::new(),
            session: Mutex::new(SessionState::new()),
            popup: Mutex::new(None),
            accounts: RwLock::new(Vec::new()),
            chain_id: RwLock::new(chain_id),
            call_lock: Mutex::new(()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub async fn accounts(&self) -> Vec<Address> {
        self.accounts.read().await.clone()
    }

    pub async fn chain_id(&self) -> u64 {
        *self.chain_id.read().await
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.lock().await.phase()
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Calls whose correlation entry has not been released yet
    pub async fn in_flight_calls(&self) -> usize {
        self.correlations.len().await
    }

    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Perform one JSON-RPC call through the wallet popup
    pub async fn request(&self, args: RequestArguments) -> Result<Value, BridgeError> {
        if let Some(value) = self.answer_locally(&args).await? {
            return Ok(value);
        }

        let _call = self.call_lock.lock().await;
        let ticket = CallTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst));
        self.correlations
            .set(ticket, Uuid::new_v4().to_string())
            .await;

        let result = self.perform_call(ticket, &args).await;

        // Released whatever the outcome
        self.correlations.delete(&ticket).await;
        if matches!(
            result,
            Err(BridgeError::PopupClosed) | Err(BridgeError::Transport(TransportError::Closed))
        ) {
            self.handle_popup_disconnect().await;
        }

        let value = result?;
        if args.method == "eth_requestAccounts" {
            self.apply_accounts(&value).await?;
        }
        Ok(value)
    }

    async fn answer_locally(&self, args: &RequestArguments) -> Result<Option<Value>, BridgeError> {
        match args.method.as_str() {
            "eth_chainId" => Ok(Some(Value::String(format!("0x{:x}", self.chain_id().await)))),
            "net_version" => Ok(Some(Value::String(self.chain_id().await.to_string()))),
            "eth_accounts" => {
                let accounts = serde_json::to_value(self.accounts().await)
                    .map_err(|e| RpcError::internal(e.to_string()))?;
                Ok(Some(accounts))
            }
            "wallet_getCallsStatus" => {
                validate_call_status_params(&args.params)?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn perform_call(
        &self,
        ticket: CallTicket,
        args: &RequestArguments,
    ) -> Result<Value, BridgeError> {
        let correlation_id = self.correlations.get(&ticket).await;
        let mut slot = self.popup.lock().await;
        let popup = self.ensure_popup(&mut slot).await?;

        if self.keys.get_shared_secret().await?.is_none() {
            self.handshake(popup, args, correlation_id.clone()).await?;
        }
        self.encrypted_call(popup, args, correlation_id).await
    }

    /// Reuse the open popup if it is still alive, otherwise open a new one
    async fn ensure_popup<'a>(
        &self,
        slot: &'a mut Option<PopupConnection>,
    ) -> Result<&'a mut PopupConnection, BridgeError> {
        let alive = match slot.as_mut() {
            Some(popup) => self.drain_pending(popup),
            None => false,
        };

        if !alive {
            if let Some(stale) = slot.take() {
                stale.target.close();
                self.on_popup_gone().await;
            }
            *slot = Some(self.open_popup().await?);
        }

        slot.as_mut().ok_or(BridgeError::PopupClosed)
    }

    /// Consume messages that arrived between calls; false if the popup left
    fn drain_pending(&self, popup: &mut PopupConnection) -> bool {
        if popup.target.is_closed() {
            return false;
        }
        loop {
            let message = match popup.inbound.try_recv() {
                Ok(message) => message,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            };
            match inspect(&popup.origin, &message) {
                Inbound::Unloaded => return false,
                Inbound::Response(_) => self.emit_stray(message.data),
                Inbound::Foreign(origin) => warn!("🚫 Ignoring message from {}", origin),
                Inbound::Loaded | Inbound::Unrecognized => {}
            }
        }
    }

    async fn open_popup(&self) -> Result<PopupConnection, BridgeError> {
        info!("🪟 Opening wallet popup at {}", self.config.popup_url);
        let window = self.opener.open(&self.config.popup_url).await?;

        let expected = self.config.popup_origin();
        if window.origin != expected {
            warn!(
                "Popup reports origin {} but {} is expected; only {} will be trusted",
                window.origin, expected, expected
            );
        }
        let mut popup = PopupConnection {
            origin: expected,
            target: window.target,
            inbound: window.inbound,
        };

        if let Err(e) = self.with_timeout(Self::wait_for_load(&mut popup)).await {
            popup.target.close();
            return Err(e);
        }
        debug!("Popup loaded");
        Ok(popup)
    }

    async fn wait_for_load(popup: &mut PopupConnection) -> Result<(), BridgeError> {
        while let Some(message) = popup.next_message().await {
            match inspect(&popup.origin, &message) {
                Inbound::Loaded => return Ok(()),
                Inbound::Unloaded => return Err(BridgeError::PopupClosed),
                Inbound::Foreign(origin) => warn!("🚫 Ignoring message from {}", origin),
                Inbound::Response(_) | Inbound::Unrecognized => {
                    debug!("Ignoring message received before PopupLoaded")
                }
            }
        }
        Err(BridgeError::PopupClosed)
    }

    async fn handshake(
        &self,
        popup: &mut PopupConnection,
        args: &RequestArguments,
        correlation_id: Option<String>,
    ) -> Result<(), BridgeError> {
        self.session.lock().await.begin_handshake();
        let result = self.run_handshake(popup, args, correlation_id).await;

        let clear_now = self.session.lock().await.finish_handshake(result.is_ok());
        if clear_now {
            info!("Applying key rotation deferred during handshake");
            self.keys.clear().await;
        }
        result
    }

    async fn run_handshake(
        &self,
        popup: &mut PopupConnection,
        args: &RequestArguments,
        correlation_id: Option<String>,
    ) -> Result<(), BridgeError> {
        let own = self.keys.get_own_public_key().await?;
        let content = RequestContent::Handshake(HandshakeContent {
            method: args.method.clone(),
            params: args.params.clone(),
        });
        let request = create_request(content, &own, correlation_id);
        info!("🤝 Handshake for {}", args.method);

        let response = self.post_and_wait(popup, request).await?;
        let payload = match response.content {
            ResponseContent::Failure(failure) => return Err(BridgeError::Rpc(failure.into())),
            ResponseContent::Encrypted(payload) => payload,
        };

        let peer = import_key_from_hex(&response.sender)?;
        self.keys.set_peer_public_key(peer).await;

        match self.read_acknowledgment(&payload).await {
            Ok(chain_id) => {
                if let Some(chain_id) = chain_id {
                    self.update_chain(chain_id).await;
                }
                info!("✅ Shared secret established");
                Ok(())
            }
            Err(e) => {
                // A peer key whose acknowledgment cannot be read is unusable
                self.keys.clear().await;
                Err(e)
            }
        }
    }

    async fn read_acknowledgment(
        &self,
        payload: &EncryptedPayload,
    ) -> Result<Option<u64>, BridgeError> {
        let secret = self
            .keys
            .get_shared_secret()
            .await?
            .ok_or(CryptoError::MissingSharedSecret)?;
        let ack: ResponsePayload = decrypt_content(payload, &secret)?;
        if let CallResult::Error(err) = ack.result {
            return Err(BridgeError::Rpc(err.into()));
        }
        Ok(ack.chain_id)
    }

    async fn encrypted_call(
        &self,
        popup: &mut PopupConnection,
        args: &RequestArguments,
        correlation_id: Option<String>,
    ) -> Result<Value, BridgeError> {
        let secret = self
            .keys
            .get_shared_secret()
            .await?
            .ok_or(CryptoError::MissingSharedSecret)?;

        let payload = RequestPayload {
            action: RequestAction {
                method: args.method.clone(),
                params: args.params.clone(),
            },
            chain_id: self.chain_id().await,
        };
        let encrypted = encrypt_content(&payload, &secret)?;
        let own = self.keys.get_own_public_key().await?;
        let request = create_request(RequestContent::Encrypted(encrypted), &own, correlation_id);
        debug!("Sending encrypted {} ({})", args.method, request.id);

        let response = self.post_and_wait(popup, request).await?;
        let reply: ResponsePayload = match response.content {
            ResponseContent::Failure(failure) => return Err(BridgeError::Rpc(failure.into())),
            ResponseContent::Encrypted(payload) => decrypt_content(&payload, &secret)?,
        };

        if let Some(chain_id) = reply.chain_id {
            self.update_chain(chain_id).await;
        }
        match reply.result {
            CallResult::Value(value) => Ok(value),
            CallResult::Error(err) => Err(BridgeError::Rpc(err.into())),
        }
    }

    async fn post_and_wait(
        &self,
        popup: &mut PopupConnection,
        request: RpcRequest,
    ) -> Result<RpcResponse, BridgeError> {
        let request_id = request.id;
        let data = WireMessage::Request(request).to_value()?;
        popup
            .target
            .post_message(data, &TargetOrigin::Exact(popup.origin.clone()))?;
        self.with_timeout(self.await_response(popup, request_id))
            .await
    }

    /// Wait for the response whose `requestId` matches; arrival order is
    /// irrelevant
    async fn await_response(
        &self,
        popup: &mut PopupConnection,
        request_id: Uuid,
    ) -> Result<RpcResponse, BridgeError> {
        while let Some(message) = popup.next_message().await {
            match inspect(&popup.origin, &message) {
                Inbound::Response(response) if response.request_id == request_id => {
                    return Ok(response)
                }
                Inbound::Response(_) => self.emit_stray(message.data),
                Inbound::Unloaded => return Err(BridgeError::PopupClosed),
                Inbound::Foreign(origin) => warn!("🚫 Ignoring message from {}", origin),
                Inbound::Loaded | Inbound::Unrecognized => {
                    debug!("Ignoring non-response message while awaiting {}", request_id)
                }
            }
        }
        Err(BridgeError::PopupClosed)
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, BridgeError>>,
    {
        match self.config.response_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| BridgeError::Timeout(limit))?,
            None => fut.await,
        }
    }

    fn emit_stray(&self, data: Value) {
        debug!("Forwarding unmatched popup response as a message event");
        self.events.emit(&ProviderEvent::Message {
            kind: "popup_response".to_string(),
            data,
        });
    }

    async fn update_chain(&self, chain_id: u64) {
        let changed = {
            let mut current = self.chain_id.write().await;
            let changed = *current != chain_id;
            *current = chain_id;
            changed
        };
        if changed {
            info!("⛓️  Chain changed to {}", chain_id);
            self.events.emit(&ProviderEvent::ChainChanged(chain_id));
        }
    }

    async fn apply_accounts(&self, value: &Value) -> Result<(), BridgeError> {
        let accounts: Vec<Address> = serde_json::from_value(value.clone()).map_err(|e| {
            RpcError::internal(format!("Wallet returned malformed accounts: {}", e))
        })?;

        let was_empty = {
            let mut current = self.accounts.write().await;
            let was_empty = current.is_empty();
            *current = accounts.clone();
            was_empty
        };

        if was_empty && !accounts.is_empty() {
            let chain_id = self.chain_id().await;
            self.events.emit(&ProviderEvent::Connect { chain_id });
        }
        self.events.emit(&ProviderEvent::AccountsChanged(accounts));
        Ok(())
    }

    /// Forget accounts and notify listeners; key material is kept
    pub async fn disconnect(&self) {
        self.accounts.write().await.clear();
        info!("🔌 Provider disconnected");
        self.events
            .emit(&ProviderEvent::Disconnect(RpcError::disconnected()));
    }

    /// Wipe key material, or schedule the wipe if a handshake is outstanding
    pub async fn clear_session(&self) -> ClearAction {
        let mut session = self.session.lock().await;
        let action = session.request_clear();
        match action {
            ClearAction::Now => self.keys.clear().await,
            ClearAction::Deferred => info!("Handshake in progress, key rotation deferred"),
        }
        action
    }

    /// Close the popup window, if one is open
    ///
    /// Treated as a popup-initiated disconnect. Waits for an in-flight call
    /// to finish.
    pub async fn close_popup(&self) -> bool {
        let _call = self.call_lock.lock().await;
        let closed = match self.popup.lock().await.take() {
            Some(popup) => {
                popup.target.close();
                true
            }
            None => false,
        };
        if closed {
            self.on_popup_gone().await;
        }
        closed
    }

    async fn handle_popup_disconnect(&self) {
        if let Some(popup) = self.popup.lock().await.take() {
            popup.target.close();
        }
        self.on_popup_gone().await;
    }

    async fn on_popup_gone(&self) {
        warn!("Popup went away, rotating keys");
        self.disconnect().await;
        self.clear_session().await;
    }
}

/// `wallet_getCallsStatus` takes the call identifier as its first param
fn validate_call_status_params(params: &Value) -> Result<CallIdentifier, RpcError> {
    let encoded = params
        .get(0)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("Expected a call identifier as the first parameter"))?;
    CallIdentifier::decode(encoded)
        .map_err(|e| RpcError::invalid_params(format!("Invalid call identifier: {}", e)))
}
