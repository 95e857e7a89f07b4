//! Transaction signing
//!
//! The trading API returns transactions that already name the trader as a required
//! signer (usually the fee payer) and may carry signatures from other parties. Signing
//! fills the trader's slot and leaves every other signature untouched.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;

use crate::crypto::keypair::{keypair_from_env, keypair_from_str};
use crate::error::WorkflowError;

/// Capability to sign serialized transactions on behalf of one wallet.
pub trait TransactionSigner: Send + Sync {
    /// Public key of the wallet
    fn pubkey(&self) -> Pubkey;

    /// Signs a bincode-serialized `VersionedTransaction` and returns the re-serialized bytes.
    fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, WorkflowError>;
}

/// Signer backed by an in-memory Solana keypair.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Decodes a base58 or JSON byte-array wallet key.
    pub fn from_encoded(encoded: &str) -> Result<Self, WorkflowError> {
        keypair_from_str(encoded).map(Self::new)
    }

    /// Loads the wallet key from the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self, WorkflowError> {
        keypair_from_env(var_name).map(Self::new)
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("pubkey", &self.keypair.pubkey())
            .finish()
    }
}

impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, WorkflowError> {
        let mut transaction: VersionedTransaction = bincode::deserialize(unsigned)
            .map_err(|e| WorkflowError::Signing(format!("failed to decode transaction: {}", e)))?;

        let signer_index = required_signer_index(&transaction, &self.keypair.pubkey())?;

        let message_bytes = transaction.message.serialize();
        let signature = self.keypair.sign_message(&message_bytes);

        let required = usize::from(transaction.message.header().num_required_signatures);
        if transaction.signatures.len() < required {
            transaction
                .signatures
                .resize(required, Signature::default());
        }
        transaction.signatures[signer_index] = signature;

        bincode::serialize(&transaction)
            .map_err(|e| WorkflowError::Signing(format!("failed to encode transaction: {}", e)))
    }
}

/// Finds the signature slot for `signer` among the message's required signers.
fn required_signer_index(
    transaction: &VersionedTransaction,
    signer: &Pubkey,
) -> Result<usize, WorkflowError> {
    let required = usize::from(transaction.message.header().num_required_signatures);
    transaction
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| key == signer)
        .ok_or_else(|| {
            WorkflowError::Signing(format!(
                "transaction does not require a signature from {}",
                signer
            ))
        })
}

/// Returns the first (fee payer) signature of a serialized transaction.
///
/// This is the signature the chain reports status under once the transaction lands.
pub fn transaction_signature(serialized: &[u8]) -> Result<Signature, WorkflowError> {
    let transaction: VersionedTransaction = bincode::deserialize(serialized)
        .map_err(|e| WorkflowError::Signing(format!("failed to decode transaction: {}", e)))?;
    transaction
        .signatures
        .first()
        .copied()
        .ok_or_else(|| WorkflowError::Signing("transaction carries no signatures".to_string()))
}
