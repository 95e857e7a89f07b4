//! Solana JSON-RPC Client
//!
//! Minimal JSON-RPC client implementing `ChainConnection`: transaction submission,
//! signature status lookup, block height and base64 account reads.

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{ChainConnection, ConfirmationLevel, SignatureStatus};
use crate::config::ChainConfig;
use crate::error::WorkflowError;

// ============================================================================
// JSON-RPC TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcContextValue<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    confirmation_status: Option<ConfirmationLevel>,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    data: (String, String),
}

// ============================================================================
// CLIENT
// ============================================================================

/// Solana JSON-RPC connection. Cheap to share behind an `Arc`; reqwest pools connections.
pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
}

impl SolanaRpcClient {
    /// Creates a new RPC client.
    ///
    /// # Arguments
    ///
    /// * `config` - Chain configuration (RPC URL and request timeout)
    ///
    /// # Returns
    ///
    /// * `Ok(SolanaRpcClient)` - Initialized client
    /// * `Err(anyhow::Error)` - HTTP client could not be built
    pub fn new(config: &ChainConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, WorkflowError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WorkflowError::network(method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WorkflowError::network(method, e))?;

        if !status.is_success() {
            return Err(WorkflowError::Rpc {
                method: method.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }
        if body.trim().is_empty() {
            return Err(WorkflowError::malformed(method, "empty response body"));
        }

        let parsed: JsonRpcResponse<T> = serde_json::from_str(&body)
            .map_err(|e| WorkflowError::malformed(method, e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(WorkflowError::Rpc {
                method: method.to_string(),
                message: format!("{} (code {})", error.message, error.code),
            });
        }

        parsed
            .result
            .ok_or_else(|| WorkflowError::malformed(method, "missing result"))
    }
}

#[async_trait]
impl ChainConnection for SolanaRpcClient {
    async fn submit_raw(&self, transaction: &[u8]) -> Result<Signature, WorkflowError> {
        let params = serde_json::json!([
            STANDARD.encode(transaction),
            { "encoding": "base64", "preflightCommitment": "confirmed" }
        ]);
        let signature: String = self.call("sendTransaction", params).await?;
        debug!("sendTransaction accepted: {}", signature);

        Signature::from_str(&signature).map_err(|_| {
            WorkflowError::malformed("sendTransaction", format!("invalid signature '{}'", signature))
        })
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, WorkflowError> {
        let params = serde_json::json!([
            [signature.to_string()],
            { "searchTransactionHistory": true }
        ]);
        let result: RpcContextValue<Vec<Option<RpcSignatureStatus>>> =
            self.call("getSignatureStatuses", params).await?;

        Ok(result
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                slot: status.slot,
                confirmation_level: status.confirmation_status,
                err: status.err.filter(|e| !e.is_null()).map(|e| e.to_string()),
            }))
    }

    async fn block_height(&self) -> Result<u64, WorkflowError> {
        self.call("getBlockHeight", serde_json::json!([{ "commitment": "confirmed" }]))
            .await
    }

    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, WorkflowError> {
        let params = serde_json::json!([
            address.to_string(),
            { "encoding": "base64", "commitment": "confirmed" }
        ]);
        let result: RpcContextValue<Option<RpcAccount>> =
            self.call("getAccountInfo", params).await?;

        let Some(account) = result.value else {
            return Ok(None);
        };

        let data = STANDARD.decode(&account.data.0).map_err(|e| {
            WorkflowError::malformed("getAccountInfo", format!("invalid base64 account data: {}", e))
        })?;
        Ok(Some(data))
    }
}
