//! Market Lifecycle
//!
//! Finds the most active prediction market, picks its cheaper outcome side and buys
//! exactly one contract if it costs no more than `lifecycle.max_cost`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin market_lifecycle -- --config config/workflow.toml
//! ```

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use swap_workflow::{
    KeypairSigner, LifecycleOutcome, MarketLifecycle, MetadataClient, SolanaRpcClient,
    SwapWorkflow, WorkflowConfig,
};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "market_lifecycle")]
#[command(about = "Buy one contract of the cheaper side of the most active market")]
struct Args {
    /// Path to configuration file (default: config/workflow.toml or SWAP_WORKFLOW_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = WorkflowConfig::load_from_path(args.config.as_deref())?;
    let lifecycle_config = config.lifecycle()?.clone();
    info!("Metadata API: {}", config.service.metadata_api_url);
    info!(
        "Settlement mint: {} (probe {}, max cost {})",
        lifecycle_config.settlement_mint, lifecycle_config.probe_amount, lifecycle_config.max_cost
    );

    let signer = KeypairSigner::from_env(&config.chain.private_key_env)?;
    let chain = Arc::new(SolanaRpcClient::new(&config.chain)?);
    let workflow = SwapWorkflow::new(&config, chain, signer)?;
    let metadata = MetadataClient::new(&config.service)?;
    let lifecycle = MarketLifecycle::new(metadata, workflow, lifecycle_config);

    tokio::select! {
        result = lifecycle.run() => match result {
            Ok(outcome @ LifecycleOutcome::Executed { .. }) => info!("{}", outcome),
            Ok(outcome) => warn!("{}", outcome),
            Err(e) => {
                error!("Market lifecycle failed: {}", e);
                return Err(e.into());
            }
        },
        _ = signal::ctrl_c() => {
            warn!("Interrupted");
        }
    }

    Ok(())
}
