//! Wallet key loading
//!
//! Solana private keys are 64 bytes (seed + public key). Two encodings are accepted:
//! base58 (as exported by wallets) and a JSON byte array (as written by `solana-keygen`).
//! Errors describe the shape of the problem only; key text and bytes are never echoed.

use solana_sdk::signature::Keypair;

use crate::error::WorkflowError;

/// Decodes a wallet key from base58 or JSON byte-array text.
///
/// # Arguments
///
/// * `encoded` - Key text; surrounding whitespace is ignored
///
/// # Returns
///
/// * `Ok(Keypair)` - Decoded keypair
/// * `Err(WorkflowError::Key)` - Unrecognised encoding or wrong length
pub fn keypair_from_str(encoded: &str) -> Result<Keypair, WorkflowError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Key("wallet key is empty".to_string()));
    }

    let bytes = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(trimmed).map_err(|_| {
            WorkflowError::Key("wallet key is not a valid JSON byte array".to_string())
        })?
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .map_err(|_| WorkflowError::Key("wallet key is not valid base58".to_string()))?
    };

    if bytes.len() != 64 {
        return Err(WorkflowError::Key(format!(
            "wallet key must decode to 64 bytes, got {}",
            bytes.len()
        )));
    }

    Keypair::try_from(bytes.as_slice())
        .map_err(|_| WorkflowError::Key("wallet key bytes do not form a valid keypair".to_string()))
}

/// Reads and decodes a wallet key from the named environment variable.
pub fn keypair_from_env(var_name: &str) -> Result<Keypair, WorkflowError> {
    let encoded = std::env::var(var_name).map_err(|_| {
        WorkflowError::Key(format!("missing wallet key env var: {}", var_name))
    })?;
    keypair_from_str(&encoded)
}
