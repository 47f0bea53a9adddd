// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clap::Args;
use ethers::types::{Address, H256};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{BridgeConfig, PopupConfig};
use crate::errors::{LegacyError, RpcError};
use crate::popup::{Popup, WalletRequestHandler};
use crate::protocol::{CallIdentifier, CallKind};
use crate::provider::{EventKind, Provider, ProviderEvent, RequestArguments};
use crate::transport::memory::InMemoryOpener;

/// Arguments for the demo command
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// TOML config file (defaults to environment variables)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Origin the dApp window reports
    #[arg(long, default_value = "https://dapp.localhost")]
    pub dapp_origin: String,

    /// Switch the wallet to this chain after connecting
    #[arg(long)]
    pub switch_chain: Option<u64>,
}

/// Canned wallet used by the demo
pub struct DemoWallet {
    accounts: Vec<Address>,
}

impl DemoWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self { accounts }
    }
}

impl Default for DemoWallet {
    fn default() -> Self {
        Self::new(vec![Address::from_low_u64_be(0xfab5)])
    }
}

#[async_trait]
impl WalletRequestHandler for DemoWallet {
    async fn handle_request(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(serde_json::to_value(&self.accounts)?),
            "wallet_switchEthereumChain" => Ok(Value::Null),
            "wallet_sendCalls" => {
                let chain_id = params
                    .get(0)
                    .and_then(|call| call.get("chainId"))
                    .and_then(Value::as_str)
                    .and_then(|id| u64::from_str_radix(id.trim_start_matches("0x"), 16).ok())
                    .ok_or_else(|| RpcError::invalid_params("wallet_sendCalls needs a chainId"))?;
                let hash = H256::from_low_u64_be(chain_id);
                Ok(json!(CallIdentifier::new(chain_id, CallKind::Operation, hash).encode()))
            }
            "wallet_getCallsStatus" => Ok(json!({ "status": "CONFIRMED", "receipts": [] })),
            "personal_sign" => Err(LegacyError {
                method: method.to_string(),
                error_code: None,
                error_message: "User denied message signature".to_string(),
            }
            .into()),
            other => Err(RpcError::unsupported_method(other).into()),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    let config = match path {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

/// Build a Provider whose popups run [`DemoWallet`] in-process
pub fn demo_provider(config: &BridgeConfig, dapp_origin: &str) -> Provider {
    let popup_config: PopupConfig = config.popup.clone();
    let opener = InMemoryOpener::new(dapp_origin, move |window| {
        let popup = Popup::new(window.target, Arc::new(DemoWallet::default()), popup_config.clone());
        popup.listen(window.inbound);
    });
    Provider::new(config.provider.clone(), Arc::new(opener))
}

pub async fn run_demo(args: DemoArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let provider = demo_provider(&config, &args.dapp_origin);

    provider.on(EventKind::AccountsChanged, |event| {
        if let ProviderEvent::AccountsChanged(accounts) = event {
            println!("👤 Accounts changed: {:?}", accounts);
        }
    });
    provider.on(EventKind::ChainChanged, |event| {
        if let ProviderEvent::ChainChanged(chain_id) = event {
            println!("⛓️  Chain changed: {}", chain_id);
        }
    });

    println!("🔗 Connecting to {}...", config.provider.popup_url);
    let accounts = provider
        .request(RequestArguments::new("eth_requestAccounts", json!([])))
        .await
        .map_err(|e| anyhow!("eth_requestAccounts failed: {}", e))?;
    println!("✅ Accounts: {}", accounts);

    if let Some(chain_id) = args.switch_chain {
        provider
            .request(RequestArguments::new(
                "wallet_switchEthereumChain",
                json!([{ "chainId": format!("0x{:x}", chain_id) }]),
            ))
            .await?;
    }

    let chain_hex = provider
        .request(RequestArguments::new("eth_chainId", Value::Null))
        .await?;
    println!("⛓️  Chain ID: {} ({})", provider.chain_id().await, chain_hex);

    let call_id = provider
        .request(RequestArguments::new(
            "wallet_sendCalls",
            json!([{ "chainId": chain_hex, "calls": [] }]),
        ))
        .await?;
    println!("📨 Submitted calls: {}", call_id);

    let status = provider
        .request(RequestArguments::new("wallet_getCallsStatus", json!([call_id])))
        .await?;
    println!("📊 Status: {}", status);

    match provider
        .request(RequestArguments::new("personal_sign", json!(["0x68656c6c6f"])))
        .await
    {
        Ok(signature) => println!("✍️  Signature: {}", signature),
        Err(e) => println!("🚫 personal_sign rejected: {} (code {})", e, e.code()),
    }

    provider.close_popup().await;
    info!("Demo finished");
    Ok(())
}
