//! Swap workflow library
//!
//! Quote → sign → submit → monitor for swaps executed through a Solana trading API,
//! plus the prediction-market discovery client used to pick what to trade.

pub mod chains;
pub mod config;
pub mod crypto;
pub mod error;
pub mod metadata_client;
pub mod service;
pub mod trading_client;
pub mod types;

// Re-export public types for convenience
pub use chains::{ChainConnection, Confirmation, SignatureStatus, SolanaRpcClient};
pub use config::{
    ChainConfig, LifecycleConfig, MonitorConfig, ServiceConfig, TradeConfig, WorkflowConfig,
};
pub use crypto::{KeypairSigner, TransactionSigner};
pub use error::{ApiErrorCode, WorkflowError};
pub use metadata_client::{
    Event, EventQuery, Market, MarketAccounts, MetadataClient, Orderbook, PriceLevel, Series,
};
pub use service::lifecycle::{LifecycleOutcome, MarketLifecycle};
pub use service::market::{
    best_bid, cheaper_side, keep_more_active, scale_to_target, select_most_active_market,
    OutcomeSide,
};
pub use service::monitor::{OrderAccount, OrderMonitor};
pub use service::workflow::{classify_order_status, SwapOutcome, SwapWorkflow};
pub use trading_client::TradingApiClient;
pub use types::{
    Fill, FillTotals, Intent, OrderStatus, OrderSubmission, QuoteResult, TradeRequest,
};
