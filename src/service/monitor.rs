//! Order Monitor
//!
//! Observes a declarative order until it reaches a terminal status.
//!
//! Each poll:
//! 1. Until the opening transaction is seen, looks up its signature. An execution error
//!    resolves the order as `OPEN_FAILED`.
//! 2. Reads the order account. A closed account resolves as `CLOSED`; an open one is
//!    `PENDING_CLOSE` and polling continues. An account that disappears after having been
//!    seen was closed and reclaimed, so it resolves as `CLOSED` with the last fills.
//! 3. If neither the opening transaction nor the account exists and the chain is past
//!    the transaction's last valid block height, the order resolves as `OPEN_EXPIRED`.
//!
//! The whole wait runs under one deadline. Dropping the returned future cancels it.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::chains::ChainConnection;
use crate::config::MonitorConfig;
use crate::error::WorkflowError;
use crate::types::{Fill, FillTotals, OrderStatus, OrderSubmission};

const ORDER_ACCOUNT: &str = "order account";

/// Lower bound on the delay between two polls of the chain.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// ORDER ACCOUNT
// ============================================================================

/// On-chain order account (Borsh encoded).
///
/// Layout: `discriminator[8] | owner[32] | input_mint[32] | output_mint[32] |
/// in_amount u64 | closed bool | fills Vec<Fill>`. Accounts are allocated with spare
/// room for fills, so trailing bytes after the encoded value are ignored.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OrderAccount {
    pub discriminator: [u8; 8],
    pub owner: [u8; 32],
    pub input_mint: [u8; 32],
    pub output_mint: [u8; 32],
    pub in_amount: u64,
    pub closed: bool,
    pub fills: Vec<Fill>,
}

impl OrderAccount {
    /// Decodes account data, ignoring trailing padding.
    ///
    /// Accounts whose summed fills overflow `u64` are rejected as malformed.
    pub fn decode(data: &[u8]) -> Result<Self, WorkflowError> {
        let mut buf = data;
        let account: Self = BorshDeserialize::deserialize(&mut buf).map_err(|e| {
            WorkflowError::malformed(ORDER_ACCOUNT, format!("failed to decode order account: {}", e))
        })?;

        if FillTotals::checked_from_fills(&account.fills).is_none() {
            return Err(WorkflowError::malformed(ORDER_ACCOUNT, "fill totals overflow u64"));
        }
        Ok(account)
    }

    pub fn owner(&self) -> Pubkey {
        Pubkey::new_from_array(self.owner)
    }

    pub fn input_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.input_mint)
    }

    pub fn output_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.output_mint)
    }

    /// Status implied by the account alone.
    pub fn status(&self) -> OrderStatus {
        if self.closed {
            OrderStatus::Closed {
                fills: self.fills.clone(),
            }
        } else {
            OrderStatus::PendingClose {
                fills: self.fills.clone(),
            }
        }
    }
}

// ============================================================================
// MONITOR
// ============================================================================

/// What has been observed about one order so far.
#[derive(Debug, Default)]
struct Observation {
    opened: bool,
    account_seen: bool,
    last_status: Option<OrderStatus>,
}

/// Polls the chain for the resolution of declarative orders.
pub struct OrderMonitor<C: ChainConnection> {
    chain: Arc<C>,
    poll_interval: Duration,
    timeout: Duration,
}

impl<C: ChainConnection> OrderMonitor<C> {
    /// Creates a monitor; the poll interval is clamped to `MIN_POLL_INTERVAL`.
    pub fn new(chain: Arc<C>, config: &MonitorConfig) -> Self {
        Self {
            chain,
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            timeout: config.timeout(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits until the order reaches `CLOSED`, `OPEN_EXPIRED` or `OPEN_FAILED`.
    ///
    /// # Arguments
    ///
    /// * `submission` - Order address returned by the trading API
    /// * `open_signature` - Signature of the signed opening transaction
    /// * `last_valid_block_height` - Expiry of the opening transaction, if known. Without
    ///   it `OPEN_EXPIRED` cannot be detected and only the deadline applies.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderStatus)` - A terminal status
    /// * `Err(WorkflowError::MonitorTimeout)` - Deadline elapsed; carries the last observed status
    /// * `Err(WorkflowError)` - A chain read failed or the account could not be decoded
    pub async fn wait_for_terminal(
        &self,
        submission: &OrderSubmission,
        open_signature: &Signature,
        last_valid_block_height: Option<u64>,
    ) -> Result<OrderStatus, WorkflowError> {
        info!(
            "Monitoring order {} (program {}, timeout {:?})",
            submission.order_address, submission.program_id, self.timeout
        );

        let mut observation = Observation::default();
        let result = tokio::time::timeout(
            self.timeout,
            self.poll_until_terminal(
                &mut observation,
                &submission.order_address,
                open_signature,
                last_valid_block_height,
            ),
        )
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Err(WorkflowError::MonitorTimeout {
                order_address: submission.order_address.to_string(),
                waited: self.timeout,
                last_status: observation.last_status,
            }),
        }
    }

    async fn poll_until_terminal(
        &self,
        observation: &mut Observation,
        order_address: &Pubkey,
        open_signature: &Signature,
        last_valid_block_height: Option<u64>,
    ) -> Result<OrderStatus, WorkflowError> {
        loop {
            if let Some(status) = self
                .observe(observation, order_address, open_signature, last_valid_block_height)
                .await?
            {
                if observation.last_status.as_ref() != Some(&status) {
                    info!("Order {} status: {}", order_address, status);
                }
                observation.last_status = Some(status.clone());
                if status.is_terminal() {
                    return Ok(status);
                }
            } else {
                debug!("Order {} not yet visible on-chain", order_address);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One observation. `None` means nothing is known about the order yet.
    async fn observe(
        &self,
        observation: &mut Observation,
        order_address: &Pubkey,
        open_signature: &Signature,
        last_valid_block_height: Option<u64>,
    ) -> Result<Option<OrderStatus>, WorkflowError> {
        if !observation.opened {
            if let Some(status) = self.chain.signature_status(open_signature).await? {
                if let Some(error) = status.err {
                    return Ok(Some(OrderStatus::OpenFailed {
                        transaction_error: error,
                    }));
                }
                debug!("Opening transaction {} landed in slot {}", open_signature, status.slot);
                observation.opened = true;
            }
        }

        match self.chain.read_account(order_address).await? {
            Some(data) => {
                let account = OrderAccount::decode(&data)?;
                observation.opened = true;
                observation.account_seen = true;
                Ok(Some(account.status()))
            }
            None if observation.account_seen => {
                let fills = observation
                    .last_status
                    .as_ref()
                    .map(|s| s.fills().to_vec())
                    .unwrap_or_default();
                Ok(Some(OrderStatus::Closed { fills }))
            }
            None if !observation.opened => match last_valid_block_height {
                Some(last_valid) => {
                    let height = self.chain.block_height().await?;
                    if height > last_valid {
                        Ok(Some(OrderStatus::OpenExpired))
                    } else {
                        Ok(None)
                    }
                }
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}
