//! Imperative Swap
//!
//! Requests a quote from the trading API, signs the returned transaction, broadcasts it
//! and waits for confirmation.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin swap -- --input-mint <MINT> --output-mint <MINT> --amount 1000000
//! ```
//!
//! The wallet key is read from the environment variable named by `chain.private_key_env`.

use anyhow::{Context, Result};
use clap::Parser;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use swap_workflow::{KeypairSigner, SolanaRpcClient, SwapWorkflow, WorkflowConfig};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "swap")]
#[command(about = "Quote, sign, submit and confirm a swap")]
struct Args {
    /// Path to configuration file (default: config/workflow.toml or SWAP_WORKFLOW_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Mint of the token to sell
    #[arg(long)]
    input_mint: String,

    /// Mint of the token to buy
    #[arg(long)]
    output_mint: String,

    /// Amount to sell, in the input token's smallest unit
    #[arg(long)]
    amount: u64,

    /// Slippage tolerance in basis points (default: trade.slippage_bps)
    #[arg(long)]
    slippage_bps: Option<u16>,

    /// Comma-separated venue filter
    #[arg(long, value_delimiter = ',')]
    venues: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = WorkflowConfig::load_from_path(args.config.as_deref())?;
    info!("Trading API: {}", config.service.trade_api_url);
    info!("RPC: {}", config.chain.rpc_url);

    let input_mint = Pubkey::from_str(&args.input_mint).context("Invalid --input-mint")?;
    let output_mint = Pubkey::from_str(&args.output_mint).context("Invalid --output-mint")?;

    let signer = KeypairSigner::from_env(&config.chain.private_key_env)?;
    let chain = Arc::new(SolanaRpcClient::new(&config.chain)?);
    let workflow = SwapWorkflow::new(&config, chain, signer)?;
    info!("Trader: {}", workflow.trader());

    let request = workflow
        .trade_request(input_mint, output_mint, args.amount, args.slippage_bps)?
        .with_venues(args.venues);

    tokio::select! {
        result = workflow.execute_imperative(&request) => match result {
            Ok(outcome) if outcome.is_success() => info!("{}", outcome),
            Ok(outcome) => warn!("{}", outcome),
            Err(e) => {
                error!("Swap failed: {}", e);
                return Err(e.into());
            }
        },
        _ = signal::ctrl_c() => {
            warn!("Interrupted; the submitted transaction (if any) may still land");
        }
    }

    Ok(())
}
