//! Market Discovery
//!
//! Prints tags by category, series and events with their nested markets. Events are
//! walked page by page, so the full catalogue is never held in memory.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin discover_markets -- --status active --max-events 50
//! ```

use anyhow::Result;
use clap::Parser;
use futures::{pin_mut, TryStreamExt};
use swap_workflow::{EventQuery, MetadataClient, WorkflowConfig};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "discover_markets")]
#[command(about = "List prediction-market tags, series and events")]
struct Args {
    /// Path to configuration file (default: config/workflow.toml or SWAP_WORKFLOW_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Only list events in this status (e.g. "active")
    #[arg(long)]
    status: Option<String>,

    /// Only list series in this category
    #[arg(long)]
    category: Option<String>,

    /// Page size for event listing
    #[arg(long, default_value_t = 100)]
    limit: u32,

    /// Stop after this many events
    #[arg(long)]
    max_events: Option<usize>,
}

async fn discover(client: &MetadataClient, args: &Args) -> Result<()> {
    let tags = client.tags_by_categories().await?;
    for (category, tags) in &tags {
        info!("Category {}: {}", category, tags.join(", "));
    }

    let series = client.series(args.category.as_deref()).await?;
    info!("{} series", series.len());
    for s in &series {
        info!("  {} {} ({})", s.ticker, s.title, s.category.as_deref().unwrap_or("-"));
    }

    let query = EventQuery {
        limit: args.limit,
        status: args.status.clone(),
        ..EventQuery::default()
    };
    let events = client.events(query);
    pin_mut!(events);

    let mut count = 0usize;
    while let Some(event) = events.try_next().await? {
        info!("Event {} {}", event.ticker, event.title);
        for market in &event.markets {
            info!(
                "  {} [{}] volume {} {}",
                market.ticker,
                market.status,
                market.volume(),
                market.title
            );
        }
        count += 1;
        if args.max_events.is_some_and(|max| count >= max) {
            break;
        }
    }
    info!("Listed {} events", count);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = WorkflowConfig::load_from_path(args.config.as_deref())?;
    let client = MetadataClient::new(&config.service)?;
    info!("Metadata API: {}", config.service.metadata_api_url);

    tokio::select! {
        result = discover(&client, &args) => {
            if let Err(e) = result {
                error!("Discovery failed: {}", e);
                return Err(e);
            }
        }
        _ = signal::ctrl_c() => {
            warn!("Interrupted");
        }
    }

    Ok(())
}
