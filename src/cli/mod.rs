// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod call_id;
pub mod demo;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Fabstir wallet bridge CLI
#[derive(Parser, Debug)]
#[command(name = "wallet-bridge")]
#[command(version = "0.1.0")]
#[command(about = "Tools for the Fabstir dApp/wallet popup bridge", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an in-process Provider/Popup pair against a demo wallet
    Demo(demo::DemoArgs),

    /// Encode or decode call identifiers
    CallId {
        #[command(subcommand)]
        action: call_id::CallIdCommand,
    },
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Demo(args) => demo::run_demo(args).await,
        Commands::CallId { action } => call_id::run(action),
    }
}
