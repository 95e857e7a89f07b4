//! Swap Workflow
//!
//! Orchestrates quote → sign → submit → (monitor) and classifies the result.
//!
//! Imperative flow: `GET /order`, sign, broadcast through the chain connection and wait
//! for confirmation. There is no fill accounting.
//!
//! Declarative flow: `GET /intent`, sign the opening transaction, `POST /submit-intent`,
//! then monitor the order account until it is terminal and report the summed fills.
//!
//! "Zero output amount" and "insufficient liquidity" API errors are expected market
//! conditions and become `SwapOutcome::NoTradePossible` instead of errors.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::chains::ChainConnection;
use crate::config::WorkflowConfig;
use crate::crypto::{transaction_signature, TransactionSigner};
use crate::error::{ApiErrorCode, WorkflowError};
use crate::service::monitor::OrderMonitor;
use crate::trading_client::TradingApiClient;
use crate::types::{FillTotals, OrderStatus, QuoteResult, TradeRequest};

// ============================================================================
// OUTCOMES
// ============================================================================

/// Final, classified result of one workflow invocation.
///
/// `Display` renders the human-readable report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Imperative swap confirmed on-chain
    Confirmed {
        signature: Signature,
        slot: u64,
        in_amount: Option<u64>,
        out_amount: Option<u64>,
    },
    /// Declarative order executed at least once
    Filled {
        order_address: Pubkey,
        totals: FillTotals,
    },
    /// Declarative order still open when monitoring stopped, with fills already executed
    PartiallyFilled {
        order_address: Pubkey,
        totals: FillTotals,
    },
    /// Declarative order closed without fills; funds were returned
    NotFilled { order_address: Pubkey },
    /// Opening transaction expired before inclusion
    Expired { order_address: Pubkey },
    /// Opening transaction executed and failed
    Failed {
        order_address: Pubkey,
        transaction_error: String,
    },
    /// The API reported a market condition under which no trade is possible
    NoTradePossible { code: ApiErrorCode, message: String },
}

impl SwapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SwapOutcome::Confirmed { .. }
                | SwapOutcome::Filled { .. }
                | SwapOutcome::PartiallyFilled { .. }
        )
    }
}

impl fmt::Display for SwapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapOutcome::Confirmed {
                signature,
                slot,
                in_amount,
                out_amount,
            } => {
                write!(f, "Swap confirmed in slot {}: {}", slot, signature)?;
                if let (Some(in_amount), Some(out_amount)) = (in_amount, out_amount) {
                    write!(f, " (estimated in {}, out {})", in_amount, out_amount)?;
                }
                Ok(())
            }
            SwapOutcome::Filled {
                order_address,
                totals,
            } => write!(
                f,
                "Order {} filled: total in {}, total out {} across {} fill(s)",
                order_address, totals.total_in, totals.total_out, totals.fill_count
            ),
            SwapOutcome::PartiallyFilled {
                order_address,
                totals,
            } => write!(
                f,
                "Order {} partially filled: total in {}, total out {} across {} fill(s); \
                 the order was still open when monitoring stopped",
                order_address, totals.total_in, totals.total_out, totals.fill_count
            ),
            SwapOutcome::NotFilled { order_address } => write!(
                f,
                "Order {} did not fill; funds were returned",
                order_address
            ),
            SwapOutcome::Expired { order_address } => write!(
                f,
                "Order {} expired before opening; retry with a higher slippage tolerance",
                order_address
            ),
            SwapOutcome::Failed {
                order_address,
                transaction_error,
            } => write!(
                f,
                "Order {} failed to open: {}",
                order_address, transaction_error
            ),
            SwapOutcome::NoTradePossible { code, message } => {
                write!(f, "No trade possible ({}): {}", code, message)
            }
        }
    }
}

/// Classifies a terminal (or fill-bearing) order status.
///
/// `CLOSED` with fills is `Filled` and `PENDING_CLOSE` with fills is `PartiallyFilled`,
/// both with summed totals; without fills the order did not fill. `OPEN_EXPIRED` and
/// `OPEN_FAILED` map to their own outcomes.
pub fn classify_order_status(order_address: Pubkey, status: OrderStatus) -> SwapOutcome {
    match status {
        OrderStatus::Closed { fills } | OrderStatus::PendingClose { fills } if fills.is_empty() => {
            SwapOutcome::NotFilled { order_address }
        }
        OrderStatus::Closed { fills } => SwapOutcome::Filled {
            order_address,
            totals: FillTotals::from_fills(&fills),
        },
        OrderStatus::PendingClose { fills } => SwapOutcome::PartiallyFilled {
            order_address,
            totals: FillTotals::from_fills(&fills),
        },
        OrderStatus::OpenExpired => SwapOutcome::Expired { order_address },
        OrderStatus::OpenFailed { transaction_error } => SwapOutcome::Failed {
            order_address,
            transaction_error,
        },
    }
}

/// Turns a no-trade API error into an outcome; every other error is passed through.
fn no_trade_outcome(err: WorkflowError) -> Result<SwapOutcome, WorkflowError> {
    match err {
        WorkflowError::Api { code, message, .. } if code.is_no_trade() => {
            warn!("No trade possible: {} ({})", code, message);
            Ok(SwapOutcome::NoTradePossible { code, message })
        }
        other => Err(other),
    }
}

// ============================================================================
// WORKFLOW
// ============================================================================

/// Swap workflow for one wallet.
///
/// Holds no state between invocations; concurrent invocations share only the chain
/// connection.
pub struct SwapWorkflow<C: ChainConnection, S: TransactionSigner> {
    trading: TradingApiClient,
    chain: Arc<C>,
    signer: S,
    monitor: OrderMonitor<C>,
    confirm_timeout: Duration,
    confirm_poll_interval: Duration,
    default_slippage_bps: u16,
}

impl<C: ChainConnection, S: TransactionSigner> SwapWorkflow<C, S> {
    /// Creates a workflow from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded workflow configuration
    /// * `chain` - Chain connection (may be shared with other workflows)
    /// * `signer` - Wallet that signs every transaction
    ///
    /// # Returns
    ///
    /// * `Ok(SwapWorkflow)` - Ready workflow
    /// * `Err(anyhow::Error)` - Trading API client could not be built
    pub fn new(config: &WorkflowConfig, chain: Arc<C>, signer: S) -> anyhow::Result<Self> {
        let trading = TradingApiClient::new(&config.service)?;
        Ok(Self::with_client(config, trading, chain, signer))
    }

    /// Creates a workflow around an existing trading API client.
    pub fn with_client(
        config: &WorkflowConfig,
        trading: TradingApiClient,
        chain: Arc<C>,
        signer: S,
    ) -> Self {
        let monitor = OrderMonitor::new(Arc::clone(&chain), &config.monitor);
        Self {
            trading,
            chain,
            signer,
            monitor,
            confirm_timeout: config.chain.confirm_timeout(),
            confirm_poll_interval: config.chain.confirm_poll_interval(),
            default_slippage_bps: config.trade.slippage_bps,
        }
    }

    /// Public key of the wallet trading through this workflow.
    pub fn trader(&self) -> Pubkey {
        self.signer.pubkey()
    }

    /// Builds a validated request for the workflow's wallet.
    ///
    /// `slippage_bps` falls back to the configured default.
    pub fn trade_request(
        &self,
        input_mint: Pubkey,
        output_mint: Pubkey,
        amount: u64,
        slippage_bps: Option<u16>,
    ) -> Result<TradeRequest, WorkflowError> {
        TradeRequest::new(
            input_mint,
            output_mint,
            amount,
            slippage_bps.unwrap_or(self.default_slippage_bps),
            self.signer.pubkey(),
        )
    }

    /// Requests an imperative quote without executing it.
    pub async fn quote(&self, request: &TradeRequest) -> Result<QuoteResult, WorkflowError> {
        self.trading.request_quote(request).await
    }

    /// Signs, broadcasts and confirms a previously obtained quote.
    pub async fn execute_quote(&self, quote: &QuoteResult) -> Result<SwapOutcome, WorkflowError> {
        let signed = self.signer.sign_transaction(&quote.transaction)?;
        let signature = self.chain.submit_raw(&signed).await?;
        info!("Submitted swap transaction {}", signature);

        let confirmation = self
            .chain
            .confirm(&signature, self.confirm_timeout, self.confirm_poll_interval)
            .await?;
        info!("Swap {} confirmed in slot {}", signature, confirmation.slot);

        Ok(SwapOutcome::Confirmed {
            signature: confirmation.signature,
            slot: confirmation.slot,
            in_amount: quote.in_amount,
            out_amount: quote.out_amount,
        })
    }

    /// Runs the imperative flow: quote, sign, broadcast, confirm.
    ///
    /// # Returns
    ///
    /// * `Ok(SwapOutcome::Confirmed)` - Swap landed
    /// * `Ok(SwapOutcome::NoTradePossible)` - The API reported zero output or no liquidity
    /// * `Err(WorkflowError)` - Any other failure
    pub async fn execute_imperative(&self, request: &TradeRequest) -> Result<SwapOutcome, WorkflowError> {
        info!(
            "Requesting quote: {} {} -> {}",
            request.amount(),
            request.input_mint(),
            request.output_mint()
        );
        let quote = match self.quote(request).await {
            Ok(quote) => quote,
            Err(e) => return no_trade_outcome(e),
        };
        info!(
            "Quote received (in: {:?}, out: {:?})",
            quote.in_amount, quote.out_amount
        );

        self.execute_quote(&quote).await
    }

    /// Runs the declarative flow: intent, sign, submit, monitor, classify.
    ///
    /// # Returns
    ///
    /// * `Ok(SwapOutcome)` - `Filled`, `NotFilled`, `Expired`, `Failed` or `NoTradePossible`;
    ///   `PartiallyFilled` when the deadline elapsed after at least one fill
    /// * `Err(WorkflowError::MonitorTimeout)` - No terminal status and no fills before the deadline
    /// * `Err(WorkflowError)` - Any other failure
    pub async fn execute_declarative(&self, request: &TradeRequest) -> Result<SwapOutcome, WorkflowError> {
        info!(
            "Requesting intent: {} {} -> {}",
            request.amount(),
            request.input_mint(),
            request.output_mint()
        );
        let intent = match self.trading.request_intent(request).await {
            Ok(intent) => intent,
            Err(e) => return no_trade_outcome(e),
        };
        info!(
            "Intent received (in: {:?}, out: {:?})",
            intent.in_amount, intent.out_amount
        );

        let signed = self.signer.sign_transaction(&intent.open_transaction)?;
        let open_signature = transaction_signature(&signed)?;

        let submission = match self.trading.submit_intent(&intent, &signed).await {
            Ok(submission) => submission,
            Err(e) => return no_trade_outcome(e),
        };
        info!(
            "Intent submitted: order {} (opening transaction {})",
            submission.order_address, open_signature
        );

        let status = match self
            .monitor
            .wait_for_terminal(&submission, &open_signature, intent.last_valid_block_height)
            .await
        {
            Ok(status) => status,
            Err(WorkflowError::MonitorTimeout {
                waited,
                last_status: Some(status @ OrderStatus::PendingClose { .. }),
                ..
            }) if !status.fills().is_empty() => {
                warn!(
                    "Order {} still open after {:?}; reporting {} executed fill(s)",
                    submission.order_address,
                    waited,
                    status.fills().len()
                );
                status
            }
            Err(e) => return Err(e),
        };

        let outcome = classify_order_status(submission.order_address, status);
        if outcome.is_success() {
            info!("{}", outcome);
        } else {
            warn!("{}", outcome);
        }
        Ok(outcome)
    }
}
