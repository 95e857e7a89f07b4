//! Market Lifecycle Flow
//!
//! Picks the most active prediction market, buys one contract of its cheaper outcome
//! side and reports what happened.
//!
//! Flow:
//! 1. Stream events with nested markets and keep the active market with the highest volume
//! 2. Read its orderbook and choose the side with the lower best bid
//! 3. Probe a quote for `probe_amount` of the settlement mint
//! 4. Scale the probe linearly so the order yields exactly `target_out_amount`
//! 5. Skip if the scaled cost exceeds `max_cost`; re-quote and require an exact fill
//! 6. Execute the re-quoted order through the imperative flow

use futures::TryStreamExt;
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use tracing::{info, warn};

use crate::chains::ChainConnection;
use crate::config::LifecycleConfig;
use crate::crypto::TransactionSigner;
use crate::error::{ApiErrorCode, WorkflowError};
use crate::metadata_client::{EventQuery, Market, MetadataClient};
use crate::service::market::{cheaper_side, keep_more_active, scale_to_target, OutcomeSide};
use crate::service::workflow::{SwapOutcome, SwapWorkflow};
use crate::types::QuoteResult;

/// Result of one lifecycle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// No event listed an active market
    NoActiveMarket,
    /// The selected market has no bids on either side
    NoBids { market: String },
    /// The API reported zero output or missing liquidity
    NoTradePossible {
        market: String,
        side: OutcomeSide,
        code: ApiErrorCode,
        message: String,
    },
    /// The scaled order would cost more than allowed; nothing was submitted
    ExceedsMaximum {
        market: String,
        side: OutcomeSide,
        required: u64,
        max_cost: u64,
    },
    /// The re-quote would not yield exactly the target output; nothing was submitted
    InexactFill {
        market: String,
        side: OutcomeSide,
        expected: u64,
        quoted: Option<u64>,
    },
    /// The order was executed
    Executed {
        market: String,
        side: OutcomeSide,
        amount_in: u64,
        outcome: SwapOutcome,
    },
}

impl fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleOutcome::NoActiveMarket => write!(f, "No active market found"),
            LifecycleOutcome::NoBids { market } => write!(f, "Market {} has no bids", market),
            LifecycleOutcome::NoTradePossible {
                market,
                side,
                code,
                message,
            } => write!(f, "No trade possible on {} {} ({}): {}", market, side, code, message),
            LifecycleOutcome::ExceedsMaximum {
                market,
                side,
                required,
                max_cost,
            } => write!(
                f,
                "Skipping {} {}: required amount {} exceeds maximum {}",
                market, side, required, max_cost
            ),
            LifecycleOutcome::InexactFill {
                market,
                side,
                expected,
                quoted,
            } => write!(
                f,
                "Skipping {} {}: quote yields {:?}, expected exactly {}",
                market, side, quoted, expected
            ),
            LifecycleOutcome::Executed {
                market,
                side,
                amount_in,
                outcome,
            } => write!(f, "Bought {} {} for {}: {}", market, side, amount_in, outcome),
        }
    }
}

/// Either a quote or the reason no trade is possible.
enum Probe {
    Quote(QuoteResult),
    NoTrade { code: ApiErrorCode, message: String },
}

/// Market-lifecycle flow over a metadata client and a swap workflow.
pub struct MarketLifecycle<C: ChainConnection, S: TransactionSigner> {
    metadata: MetadataClient,
    workflow: SwapWorkflow<C, S>,
    config: LifecycleConfig,
}

impl<C: ChainConnection, S: TransactionSigner> MarketLifecycle<C, S> {
    pub fn new(metadata: MetadataClient, workflow: SwapWorkflow<C, S>, config: LifecycleConfig) -> Self {
        Self {
            metadata,
            workflow,
            config,
        }
    }

    /// Streams all events and returns the most active market.
    pub async fn select_market(&self) -> Result<Option<Market>, WorkflowError> {
        let query = EventQuery {
            limit: self.config.page_limit,
            with_nested_markets: true,
            ..EventQuery::default()
        };

        self.metadata
            .events(query)
            .try_fold(None, |best, event| async move {
                Ok::<_, WorkflowError>(event.markets.into_iter().fold(best, keep_more_active))
            })
            .await
    }

    async fn probe(&self, input: Pubkey, output: Pubkey, amount: u64) -> Result<Probe, WorkflowError> {
        let request = self.workflow.trade_request(input, output, amount, None)?;
        match self.workflow.quote(&request).await {
            Ok(quote) => Ok(Probe::Quote(quote)),
            Err(WorkflowError::Api { code, message, .. }) if code.is_no_trade() => {
                Ok(Probe::NoTrade { code, message })
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the whole flow once.
    ///
    /// # Returns
    ///
    /// * `Ok(LifecycleOutcome)` - What was decided or executed
    /// * `Err(WorkflowError)` - A network, API, signing or chain failure
    pub async fn run(&self) -> Result<LifecycleOutcome, WorkflowError> {
        let settlement_mint = self
            .config
            .settlement_mint()
            .map_err(|e| WorkflowError::InvalidRequest(e.to_string()))?;

        let Some(market) = self.select_market().await? else {
            warn!("No active market found");
            return Ok(LifecycleOutcome::NoActiveMarket);
        };
        info!(
            "Selected market {} ({}) with volume {}",
            market.ticker,
            market.title,
            market.volume()
        );

        let (yes_mint, no_mint) = market.outcome_mints(&settlement_mint).ok_or_else(|| {
            WorkflowError::InvalidRequest(format!(
                "market {} has no outcome mints for settlement mint {}",
                market.ticker, settlement_mint
            ))
        })?;

        let orderbook = self.metadata.orderbook(&market.ticker).await?;
        let Some(side) = cheaper_side(&orderbook) else {
            warn!("Market {} has no bids", market.ticker);
            return Ok(LifecycleOutcome::NoBids {
                market: market.ticker,
            });
        };
        let outcome_mint = match side {
            OutcomeSide::Yes => yes_mint,
            OutcomeSide::No => no_mint,
        };
        info!("Buying {} side of {} ({})", side, market.ticker, outcome_mint);

        let no_trade = |code: ApiErrorCode, message: String| LifecycleOutcome::NoTradePossible {
            market: market.ticker.clone(),
            side,
            code,
            message,
        };

        let probe = match self
            .probe(settlement_mint, outcome_mint, self.config.probe_amount)
            .await?
        {
            Probe::Quote(quote) => quote,
            Probe::NoTrade { code, message } => return Ok(no_trade(code, message)),
        };
        let probe_out = probe
            .out_amount
            .ok_or_else(|| WorkflowError::malformed("/order", "probe quote has no outAmount"))?;

        let scaled = scale_to_target(self.config.target_out_amount, self.config.probe_amount, probe_out);
        let Some(required) = scaled else {
            return Ok(no_trade(
                ApiErrorCode::ZeroOutputAmount,
                format!("probe of {} returned {}", self.config.probe_amount, probe_out),
            ));
        };
        info!(
            "Probe {} -> {}; {} required for {}",
            self.config.probe_amount, probe_out, required, self.config.target_out_amount
        );

        if required > self.config.max_cost {
            warn!("Required amount {} exceeds maximum {}", required, self.config.max_cost);
            return Ok(LifecycleOutcome::ExceedsMaximum {
                market: market.ticker.clone(),
                side,
                required,
                max_cost: self.config.max_cost,
            });
        }

        let quote = match self.probe(settlement_mint, outcome_mint, required).await? {
            Probe::Quote(quote) => quote,
            Probe::NoTrade { code, message } => return Ok(no_trade(code, message)),
        };
        if quote.out_amount != Some(self.config.target_out_amount) {
            warn!(
                "Quote for {} yields {:?}, expected {}",
                required, quote.out_amount, self.config.target_out_amount
            );
            return Ok(LifecycleOutcome::InexactFill {
                market: market.ticker.clone(),
                side,
                expected: self.config.target_out_amount,
                quoted: quote.out_amount,
            });
        }

        let outcome = self.workflow.execute_quote(&quote).await?;
        Ok(LifecycleOutcome::Executed {
            market: market.ticker.clone(),
            side,
            amount_in: required,
            outcome,
        })
    }
}
