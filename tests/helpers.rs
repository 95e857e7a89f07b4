//! Shared test helpers for workflow tests
//!
//! This module provides constants, configuration builders, transaction builders and an
//! in-memory chain connection used across the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use borsh::BorshSerialize;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use swap_workflow::chains::{ChainConnection, ConfirmationLevel, SignatureStatus};
use swap_workflow::config::{
    ChainConfig, LifecycleConfig, MonitorConfig, ServiceConfig, TradeConfig, WorkflowConfig,
};
use swap_workflow::crypto::transaction_signature;
use swap_workflow::{Fill, OrderAccount, WorkflowError};

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- TOKENS --------------------------------

/// Settlement mint (USDC)
pub const DUMMY_SETTLEMENT_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Input mint for plain swaps (wrapped SOL)
pub const DUMMY_INPUT_MINT: &str = "So11111111111111111111111111111111111111112";

/// YES outcome mint
pub const DUMMY_YES_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

/// NO outcome mint
pub const DUMMY_NO_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

// -------------------------------- ORDERS --------------------------------

/// Order account address returned by /submit-intent
pub const DUMMY_ORDER_ADDRESS: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

/// Program owning order accounts
pub const DUMMY_PROGRAM_ID: &str = "11111111111111111111111111111111";

/// Market ticker used by lifecycle tests
pub const DUMMY_MARKET_TICKER: &str = "KXTEST-26-YES";

/// Environment variable name that is never set in tests
pub const UNSET_ENV_VAR: &str = "SWAP_WORKFLOW_TEST_UNSET_VARIABLE";

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Create a default service config pointing both APIs at `base_url`.
/// This can be customized using Rust's struct update syntax:
/// ```
/// let service = ServiceConfig {
///     api_key: Some("secret".to_string()),
///     ..create_default_service_config("http://127.0.0.1:3333")
/// };
/// ```
pub fn create_default_service_config(base_url: &str) -> ServiceConfig {
    ServiceConfig {
        trade_api_url: base_url.to_string(),
        metadata_api_url: base_url.to_string(),
        api_key: None,
        api_key_env: None,
        request_timeout_ms: 5_000,
    }
}

/// Create a default chain config pointing at `rpc_url`.
pub fn create_default_chain_config(rpc_url: &str) -> ChainConfig {
    ChainConfig {
        rpc_url: rpc_url.to_string(),
        private_key_env: UNSET_ENV_VAR.to_string(),
        confirm_timeout_ms: 2_000,
        confirm_poll_interval_ms: 10,
        request_timeout_ms: 5_000,
    }
}

/// Create a monitor config with fast polling and a short deadline.
pub fn create_fast_monitor_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval_ms: 10,
        timeout_ms: 2_000,
    }
}

/// Create a default lifecycle config.
pub fn create_default_lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        settlement_mint: DUMMY_SETTLEMENT_MINT.to_string(),
        probe_amount: 1_000_000,
        target_out_amount: 1_000_000,
        max_cost: 2_000_000,
        page_limit: 2,
    }
}

/// Create a default workflow config with both APIs at `base_url`.
/// This can be customized using Rust's struct update syntax:
/// ```
/// let config = WorkflowConfig {
///     monitor: MonitorConfig { poll_interval_ms: 10, timeout_ms: 100 },
///     ..create_default_workflow_config("http://127.0.0.1:3333")
/// };
/// ```
pub fn create_default_workflow_config(base_url: &str) -> WorkflowConfig {
    WorkflowConfig {
        service: create_default_service_config(base_url),
        chain: create_default_chain_config("http://127.0.0.1:8899"),
        monitor: create_fast_monitor_config(),
        trade: TradeConfig::default(),
        lifecycle: Some(create_default_lifecycle_config()),
    }
}

// ============================================================================
// KEYS AND TRANSACTIONS
// ============================================================================

pub fn pubkey(s: &str) -> Pubkey {
    Pubkey::from_str(s).unwrap()
}

/// Build an unsigned transaction whose fee payer is `payer`, serialized with bincode.
pub fn build_unsigned_transaction(payer: &Pubkey) -> Vec<u8> {
    bincode::serialize(&build_transaction(&[*payer])).unwrap()
}

/// Build an unsigned transaction requiring a signature from every key in `signers`
/// (the first one pays fees).
pub fn build_transaction(signers: &[Pubkey]) -> VersionedTransaction {
    let accounts = signers.iter().map(|key| AccountMeta::new(*key, true)).collect();
    let instruction = Instruction::new_with_bytes(pubkey(DUMMY_PROGRAM_ID), &[1, 2, 3], accounts);
    let message = Message::new(&[instruction], signers.first());
    let required = usize::from(message.header.num_required_signatures);

    VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::Legacy(message),
    }
}

/// Base64 of an unsigned transaction for `payer`, as the trading API returns it.
pub fn encoded_unsigned_transaction(payer: &Pubkey) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(build_unsigned_transaction(payer))
}

/// Encode an order account the way the order program lays it out.
pub fn encode_order_account(closed: bool, fills: Vec<Fill>) -> Vec<u8> {
    let account = OrderAccount {
        discriminator: [42; 8],
        owner: [1; 32],
        input_mint: pubkey(DUMMY_INPUT_MINT).to_bytes(),
        output_mint: pubkey(DUMMY_SETTLEMENT_MINT).to_bytes(),
        in_amount: 1_000_000,
        closed,
        fills,
    };
    let mut data = account.try_to_vec().unwrap();
    // Accounts are allocated larger than their contents
    data.extend_from_slice(&[0u8; 32]);
    data
}

pub fn new_keypair() -> Keypair {
    Keypair::new()
}

pub fn keypair_pubkey(keypair: &Keypair) -> Pubkey {
    keypair.pubkey()
}

// ============================================================================
// IN-MEMORY CHAIN
// ============================================================================

/// Scripted responses; the last entry repeats once the script runs out.
struct Script<T: Clone> {
    entries: VecDeque<T>,
    fallback: T,
}

impl<T: Clone> Script<T> {
    fn new(entries: Vec<T>, fallback: T) -> Self {
        Self {
            entries: entries.into(),
            fallback,
        }
    }

    fn next(&mut self) -> T {
        self.entries
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// In-memory `ChainConnection` with scripted signature statuses and account reads.
pub struct FakeChain {
    signature_statuses: Mutex<Script<Option<SignatureStatus>>>,
    accounts: Mutex<Script<Option<Vec<u8>>>>,
    block_height: AtomicU64,
    submitted: Mutex<Vec<Vec<u8>>>,
    account_reads: AtomicUsize,
}

impl FakeChain {
    /// Chain where every signature is confirmed and no account exists.
    pub fn new() -> Self {
        Self {
            signature_statuses: Mutex::new(Script::new(vec![], Some(confirmed_status()))),
            accounts: Mutex::new(Script::new(vec![], None)),
            block_height: AtomicU64::new(100),
            submitted: Mutex::new(Vec::new()),
            account_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_signature_statuses(self, statuses: Vec<Option<SignatureStatus>>) -> Self {
        let fallback = statuses.last().cloned().flatten();
        *self.signature_statuses.lock().unwrap() = Script::new(statuses, fallback);
        self
    }

    pub fn with_accounts(self, accounts: Vec<Option<Vec<u8>>>) -> Self {
        let fallback = accounts.last().cloned().flatten();
        *self.accounts.lock().unwrap() = Script::new(accounts, fallback);
        self
    }

    pub fn with_block_height(self, height: u64) -> Self {
        self.block_height.store(height, Ordering::SeqCst);
        self
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn account_reads(&self) -> usize {
        self.account_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainConnection for FakeChain {
    async fn submit_raw(&self, transaction: &[u8]) -> Result<Signature, WorkflowError> {
        self.submitted.lock().unwrap().push(transaction.to_vec());
        transaction_signature(transaction)
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<Option<SignatureStatus>, WorkflowError> {
        Ok(self.signature_statuses.lock().unwrap().next())
    }

    async fn block_height(&self) -> Result<u64, WorkflowError> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn read_account(&self, _address: &Pubkey) -> Result<Option<Vec<u8>>, WorkflowError> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().next())
    }
}

pub fn confirmed_status() -> SignatureStatus {
    SignatureStatus {
        slot: 10,
        confirmation_level: Some(ConfirmationLevel::Confirmed),
        err: None,
    }
}

pub fn failed_status(error: &str) -> SignatureStatus {
    SignatureStatus {
        slot: 10,
        confirmation_level: Some(ConfirmationLevel::Confirmed),
        err: Some(error.to_string()),
    }
}
