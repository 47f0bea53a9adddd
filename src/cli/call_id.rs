// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand, ValueEnum};
use ethers::types::H256;
use std::str::FromStr;

use crate::protocol::{CallIdentifier, CallKind};

#[derive(Subcommand, Debug)]
pub enum CallIdCommand {
    /// Pack chain id, kind and hash into a call identifier
    Encode(EncodeArgs),

    /// Unpack a call identifier
    Decode(DecodeArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Operation,
    Transaction,
}

impl From<KindArg> for CallKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Operation => CallKind::Operation,
            KindArg::Transaction => CallKind::Transaction,
        }
    }
}

/// Arguments for call-id encode
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Chain ID the call was submitted on (e.g., 8453 for Base)
    #[arg(long)]
    pub chain_id: u64,

    /// What the hash refers to
    #[arg(long, value_enum)]
    pub kind: KindArg,

    /// 32-byte user operation or transaction hash (0x-prefixed hex)
    #[arg(long)]
    pub hash: String,
}

/// Arguments for call-id decode
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// 0x-prefixed call identifier
    pub id: String,
}

pub fn encode(args: &EncodeArgs) -> Result<String> {
    let hash = H256::from_str(&args.hash)
        .map_err(|e| anyhow!("Invalid hash '{}': {}", args.hash, e))?;
    Ok(CallIdentifier::new(args.chain_id, args.kind.into(), hash).encode())
}

pub fn decode(args: &DecodeArgs) -> Result<CallIdentifier> {
    CallIdentifier::decode(&args.id).map_err(|e| anyhow!("Cannot decode '{}': {}", args.id, e))
}

pub fn run(command: CallIdCommand) -> Result<()> {
    match command {
        CallIdCommand::Encode(args) => {
            println!("{}", encode(&args)?);
        }
        CallIdCommand::Decode(args) => {
            let id = decode(&args)?;
            println!("Chain ID: {}", id.chain_id);
            println!("Kind:     {:?}", id.kind);
            println!("Hash:     {:#x}", id.hash);
        }
    }
    Ok(())
}
