//! Declarative Swap
//!
//! Requests an intent, signs its opening transaction, submits it to the trading API and
//! monitors the resulting order until it is closed, expired or failed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin intent_swap -- --input-mint <MINT> --output-mint <MINT> --amount 1000000
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use swap_workflow::{
    KeypairSigner, SolanaRpcClient, SwapOutcome, SwapWorkflow, WorkflowConfig, WorkflowError,
};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "intent_swap")]
#[command(about = "Submit a declarative swap intent and monitor the order")]
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
    info!(
        "Monitor: poll every {}ms, give up after {}ms",
        config.monitor.poll_interval_ms, config.monitor.timeout_ms
    );

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
        result = workflow.execute_declarative(&request) => report(result)?,
        _ = signal::ctrl_c() => {
            warn!("Interrupted; a submitted order keeps running on-chain");
        }
    }

    Ok(())
}

/// Logs the workflow result. Errors, including giving up on monitoring, fail the process.
fn report(result: Result<SwapOutcome, WorkflowError>) -> Result<()> {
    match result {
        Ok(outcome) if outcome.is_success() => info!("{}", outcome),
        Ok(outcome) => warn!("{}", outcome),
        Err(WorkflowError::MonitorTimeout {
            order_address,
            waited,
            last_status,
        }) => {
            warn!(
                "Gave up monitoring order {} after {:?} (last status: {})",
                order_address,
                waited,
                last_status.map(|s| s.to_string()).unwrap_or_else(|| "not observed".to_string())
            );
            return Err(anyhow::anyhow!(
                "Order {} did not reach a terminal status within {:?}",
                order_address,
                waited
            ));
        }
        Err(e) => {
            error!("Intent swap failed: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}
