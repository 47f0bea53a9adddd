// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bridge configuration
//!
//! Loaded from environment variables ([`BridgeConfig::from_env`]) or a TOML
//! file with `[provider]` and `[popup]` tables ([`BridgeConfig::from_file`]).
//!
//! ```toml
//! [provider]
//! popup_url = "https://keys.example.org/connect"
//! default_chain_id = 8453
//! response_timeout_ms = 120000
//!
//! [popup]
//! chain_id = 8453
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_POPUP_URL: &str = "https://keys.fabstir.com/connect";
/// Base mainnet
pub const DEFAULT_CHAIN_ID: u64 = 8453;

/// dApp-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Where the wallet popup is opened
    pub popup_url: Url,
    /// Chain reported before the wallet has answered anything
    pub default_chain_id: u64,
    /// How long to wait for a popup reply; `None` waits forever
    pub response_timeout_ms: Option<u64>,
}

impl ProviderConfig {
    pub fn new(popup_url: Url, default_chain_id: u64) -> Self {
        Self {
            popup_url,
            default_chain_id,
            response_timeout_ms: None,
        }
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    /// Origin the popup's messages must come from
    pub fn popup_origin(&self) -> String {
        self.popup_url.origin().ascii_serialization()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            popup_url: Url::parse(DEFAULT_POPUP_URL).expect("Invalid default popup URL"),
            default_chain_id: DEFAULT_CHAIN_ID,
            response_timeout_ms: None,
        }
    }
}

/// Wallet-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Chain the wallet starts on
    pub chain_id: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub provider: ProviderConfig,
    pub popup: PopupConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file; missing tables use defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        let config: BridgeConfig =
            toml::from_str(&content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// - `WALLET_POPUP_URL`
    /// - `DEFAULT_CHAIN_ID`
    /// - `RESPONSE_TIMEOUT_MS`
    /// - `POPUP_CHAIN_ID` (defaults to `DEFAULT_CHAIN_ID`)
    ///
    /// Unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = env::var("WALLET_POPUP_URL")
            .ok()
            .and_then(|v| Url::parse(&v).ok())
        {
            config.provider.popup_url = url;
        }

        if let Some(chain_id) = env::var("DEFAULT_CHAIN_ID")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.provider.default_chain_id = chain_id;
            config.popup.chain_id = chain_id;
        }

        config.provider.response_timeout_ms = env::var("RESPONSE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok());

        if let Some(chain_id) = env::var("POPUP_CHAIN_ID")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.popup.chain_id = chain_id;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.default_chain_id == 0 || self.popup.chain_id == 0 {
            return Err(anyhow!("Chain id must be greater than 0"));
        }
        match self.provider.popup_url.scheme() {
            "https" | "http" => {}
            other => {
                return Err(anyhow!(
                    "Popup URL must use http or https, got '{}'",
                    other
                ))
            }
        }
        if self.provider.response_timeout_ms == Some(0) {
            return Err(anyhow!("Response timeout must be greater than 0"));
        }
        Ok(())
    }
}
