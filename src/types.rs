//! Domain types shared by the workflow components
//!
//! All amounts are integers in the token's smallest unit.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::error::WorkflowError;

/// Upper bound for slippage tolerance (100%).
pub const MAX_SLIPPAGE_BPS: u16 = 10_000;

// ============================================================================
// TRADE REQUEST
// ============================================================================

/// Parameters for a single quote/intent request.
///
/// Constructed fresh per workflow invocation. `new` enforces `amount > 0`,
/// `slippage_bps <= 10000` and `input_mint != output_mint`, so a value of this type is
/// always a valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    input_mint: Pubkey,
    output_mint: Pubkey,
    amount: u64,
    slippage_bps: u16,
    trader: Pubkey,
    venues: Vec<String>,
}

impl TradeRequest {
    /// Creates a validated trade request.
    ///
    /// # Returns
    ///
    /// * `Ok(TradeRequest)` - All invariants hold
    /// * `Err(WorkflowError::InvalidRequest)` - An invariant is violated
    pub fn new(
        input_mint: Pubkey,
        output_mint: Pubkey,
        amount: u64,
        slippage_bps: u16,
        trader: Pubkey,
    ) -> Result<Self, WorkflowError> {
        if amount == 0 {
            return Err(WorkflowError::InvalidRequest(
                "amount must be greater than zero".to_string(),
            ));
        }
        if slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(WorkflowError::InvalidRequest(format!(
                "slippage_bps {} exceeds maximum {}",
                slippage_bps, MAX_SLIPPAGE_BPS
            )));
        }
        if input_mint == output_mint {
            return Err(WorkflowError::InvalidRequest(format!(
                "input and output mint are the same ({})",
                input_mint
            )));
        }

        Ok(Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
            trader,
            venues: Vec::new(),
        })
    }

    /// Restricts routing to the given venues (sent as a comma-joined filter).
    pub fn with_venues<I, S>(mut self, venues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.venues = venues
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| !v.trim().is_empty())
            .collect();
        self
    }

    /// Same request with a different input amount (used when rescaling a probe).
    pub fn with_amount(&self, amount: u64) -> Result<Self, WorkflowError> {
        let mut scaled = Self::new(
            self.input_mint,
            self.output_mint,
            amount,
            self.slippage_bps,
            self.trader,
        )?;
        scaled.venues = self.venues.clone();
        Ok(scaled)
    }

    pub fn input_mint(&self) -> &Pubkey {
        &self.input_mint
    }

    pub fn output_mint(&self) -> &Pubkey {
        &self.output_mint
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn slippage_bps(&self) -> u16 {
        self.slippage_bps
    }

    pub fn trader(&self) -> &Pubkey {
        &self.trader
    }

    pub fn venues(&self) -> &[String] {
        &self.venues
    }

    /// Query parameters shared by `GET /order` and `GET /intent`.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("inputMint", self.input_mint.to_string()),
            ("outputMint", self.output_mint.to_string()),
            ("amount", self.amount.to_string()),
            ("slippageBps", self.slippage_bps.to_string()),
            ("userPublicKey", self.trader.to_string()),
        ];
        if !self.venues.is_empty() {
            params.push(("venues", self.venues.join(",")));
        }
        params
    }
}

// ============================================================================
// QUOTES AND INTENTS
// ============================================================================

/// Executable swap returned by `GET /order` (imperative flow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteResult {
    /// Unsigned transaction bytes (never empty)
    pub transaction: Vec<u8>,
    /// Estimated input amount
    pub in_amount: Option<u64>,
    /// Estimated output amount
    pub out_amount: Option<u64>,
    /// Last block height at which the transaction's blockhash is valid
    pub last_valid_block_height: Option<u64>,
}

/// Offer to open an order returned by `GET /intent` (declarative flow).
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    /// Original response payload, echoed verbatim as `quoteResponse` on submission
    pub payload: serde_json::Value,
    /// Unsigned opening transaction bytes (never empty)
    pub open_transaction: Vec<u8>,
    /// Estimated input amount
    pub in_amount: Option<u64>,
    /// Estimated output amount
    pub out_amount: Option<u64>,
    /// Last block height at which the opening transaction is valid
    pub last_valid_block_height: Option<u64>,
}

/// On-chain order created by `POST /submit-intent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSubmission {
    /// Address of the order account to monitor
    pub order_address: Pubkey,
    /// Program owning the order account
    pub program_id: Pubkey,
}

// ============================================================================
// ORDER STATUS AND FILLS
// ============================================================================

/// One execution against an open order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Fill {
    /// Input token consumed
    pub qty_in: u64,
    /// Output token received
    pub qty_out: u64,
}

/// Summed size of a set of fills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillTotals {
    pub total_in: u64,
    pub total_out: u64,
    pub fill_count: usize,
}

impl FillTotals {
    pub fn from_fills(fills: &[Fill]) -> Self {
        fills.iter().copied().collect()
    }

    /// Sums fills, or `None` if either total overflows `u64`.
    pub fn checked_from_fills(fills: &[Fill]) -> Option<Self> {
        fills.iter().try_fold(FillTotals::default(), |acc, fill| {
            Some(FillTotals {
                total_in: acc.total_in.checked_add(fill.qty_in)?,
                total_out: acc.total_out.checked_add(fill.qty_out)?,
                fill_count: acc.fill_count + 1,
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fill_count == 0
    }
}

/// Saturates at `u64::MAX`. Fills read from an order account never reach the clamp:
/// `OrderAccount::decode` rejects accounts whose totals overflow.
impl FromIterator<Fill> for FillTotals {
    fn from_iter<I: IntoIterator<Item = Fill>>(iter: I) -> Self {
        iter.into_iter().fold(FillTotals::default(), |acc, fill| FillTotals {
            total_in: acc.total_in.saturating_add(fill.qty_in),
            total_out: acc.total_out.saturating_add(fill.qty_out),
            fill_count: acc.fill_count + 1,
        })
    }
}

/// Observed state of a declarative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    /// Opening transaction's validity window elapsed before inclusion; no funds moved
    OpenExpired,
    /// Opening transaction executed but failed
    OpenFailed { transaction_error: String },
    /// Order is open and eligible for fills; not terminal
    PendingClose { fills: Vec<Fill> },
    /// Order lifecycle is over; `fills` is final
    Closed { fills: Vec<Fill> },
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::PendingClose { .. })
    }

    pub fn fills(&self) -> &[Fill] {
        match self {
            OrderStatus::PendingClose { fills } | OrderStatus::Closed { fills } => fills,
            OrderStatus::OpenExpired | OrderStatus::OpenFailed { .. } => &[],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::OpenExpired => write!(f, "OPEN_EXPIRED"),
            OrderStatus::OpenFailed { .. } => write!(f, "OPEN_FAILED"),
            OrderStatus::PendingClose { fills } => write!(f, "PENDING_CLOSE ({} fills)", fills.len()),
            OrderStatus::Closed { fills } => write!(f, "CLOSED ({} fills)", fills.len()),
        }
    }
}
