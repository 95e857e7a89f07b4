//! Cryptographic operations for the workflow
//!
//! This module provides wallet key loading and transaction signing.

pub mod keypair;
pub mod signing;

// Re-export for convenience
pub use keypair::{keypair_from_env, keypair_from_str};
pub use signing::{transaction_signature, KeypairSigner, TransactionSigner};
