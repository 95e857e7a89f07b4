//! Chain connection
//!
//! The workflow consumes the chain through the `ChainConnection` contract: submit raw
//! transaction bytes, look up signature status, read the block height and read account
//! data. `SolanaRpcClient` implements it over Solana JSON-RPC.

pub mod rpc;

use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::time::Duration;
use tracing::debug;

use crate::error::WorkflowError;
use crate::service::monitor::MIN_POLL_INTERVAL;

pub use rpc::SolanaRpcClient;

/// Commitment level reported for a landed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

/// Status of a transaction signature as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Slot the transaction landed in
    pub slot: u64,
    /// Commitment reached so far (None on nodes that do not report it)
    pub confirmation_level: Option<ConfirmationLevel>,
    /// On-chain execution error, if the transaction failed
    pub err: Option<String>,
}

impl SignatureStatus {
    /// True once the transaction reached `confirmed` or `finalized`.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_level,
            Some(ConfirmationLevel::Confirmed) | Some(ConfirmationLevel::Finalized)
        )
    }
}

/// Successful confirmation of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: Signature,
    pub slot: u64,
}

/// Contract the workflow needs from a chain connection.
///
/// Implementations must be safe for concurrent use; one connection may be shared by
/// many workflow invocations.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    /// Broadcasts a fully signed, serialized transaction and returns its signature.
    async fn submit_raw(&self, transaction: &[u8]) -> Result<Signature, WorkflowError>;

    /// Looks up a signature. `None` means the chain has not seen it (yet).
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, WorkflowError>;

    /// Current block height at `confirmed` commitment.
    async fn block_height(&self) -> Result<u64, WorkflowError>;

    /// Raw account data, or `None` if the account does not exist.
    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, WorkflowError>;

    /// Polls `signature_status` until the transaction is confirmed.
    ///
    /// # Returns
    ///
    /// * `Ok(Confirmation)` - Transaction reached `confirmed` or `finalized`
    /// * `Err(WorkflowError::TransactionFailed)` - Transaction landed with an error
    /// * `Err(WorkflowError::ConfirmTimeout)` - Deadline elapsed first
    async fn confirm(
        &self,
        signature: &Signature,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Confirmation, WorkflowError> {
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);

        let wait = async {
            loop {
                if let Some(status) = self.signature_status(signature).await? {
                    if let Some(err) = status.err {
                        return Err(WorkflowError::TransactionFailed {
                            signature: signature.to_string(),
                            error: err,
                        });
                    }
                    if status.is_confirmed() {
                        return Ok(Confirmation {
                            signature: *signature,
                            slot: status.slot,
                        });
                    }
                    debug!("Transaction {} at {:?}, waiting", signature, status.confirmation_level);
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(WorkflowError::ConfirmTimeout {
                signature: signature.to_string(),
                waited: timeout,
            }),
        }
    }
}
