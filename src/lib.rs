// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod popup;
pub mod protocol;
pub mod provider;
pub mod transport;

// Re-export the types most callers need
pub use config::{BridgeConfig, PopupConfig, ProviderConfig};
pub use crypto::{CryptoError, KeyManager, KeyStorage, SharedSecret};
pub use errors::{serialize_error, BridgeError, RpcError, SerializedError};
pub use popup::{IgnoreReason, MessageOutcome, Popup, WalletRequestHandler};
pub use protocol::{CallIdentifier, CallKind, CorrelationStore, WireMessage};
pub use provider::{EventKind, Provider, ProviderEvent, RequestArguments, SessionPhase};
pub use transport::{MessageTarget, PopupOpener, TargetOrigin, TransportError, WindowMessage};
