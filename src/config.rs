//! Configuration Management Module
//!
//! This module handles loading and validating configuration for the swap workflow.
//! Configuration covers the trading/metadata API endpoints, the chain connection,
//! order monitoring, trade defaults and the market-lifecycle flow.
//!
//! Configuration is read once by the binaries and passed into each client explicitly.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::service::monitor::MIN_POLL_INTERVAL;
use crate::types::MAX_SLIPPAGE_BPS;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
///
/// This structure holds configuration for:
/// - Trading and metadata API endpoints (and the optional API key)
/// - Chain RPC connection and wallet key location
/// - Order monitoring cadence and deadline
/// - Trade defaults
/// - Market-lifecycle parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// API endpoints
    pub service: ServiceConfig,
    /// Chain connection
    pub chain: ChainConfig,
    /// Order monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Trade defaults
    #[serde(default)]
    pub trade: TradeConfig,
    /// Market-lifecycle settings (only needed by the lifecycle flow)
    #[serde(default)]
    pub lifecycle: Option<LifecycleConfig>,
}

/// API endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Trading API base URL (serves /order, /intent, /submit-intent)
    pub trade_api_url: String,
    /// Prediction-market metadata API base URL
    pub metadata_api_url: String,
    /// API key sent as `x-api-key`; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable name holding the API key (optional)
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServiceConfig {
    /// Returns the API key to send, if any.
    ///
    /// The inline `api_key` wins; otherwise the variable named by `api_key_env` is read.
    /// Absence of a key is valid (reduced-tier access).
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        self.api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Chain connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,
    /// Environment variable name containing the wallet key (base58 or JSON byte array)
    pub private_key_env: String,
    /// Deadline for transaction confirmation in milliseconds
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    /// Delay between confirmation polls in milliseconds
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,
    /// Per-request RPC timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ChainConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}

/// Order monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between order observations in milliseconds
    pub poll_interval_ms: u64,
    /// Deadline for reaching a terminal status in milliseconds
    pub timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            timeout_ms: 120_000,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Trade defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Default slippage tolerance in basis points
    pub slippage_bps: u16,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self { slippage_bps: 50 }
    }
}

/// Market-lifecycle flow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Mint used to pay for outcome tokens (e.g. USDC)
    pub settlement_mint: String,
    /// Notional of the probe order, in settlement smallest units
    pub probe_amount: u64,
    /// Exact outcome-token output the scaled order must produce
    #[serde(default = "default_target_out_amount")]
    pub target_out_amount: u64,
    /// Maximum settlement amount the scaled order may cost
    pub max_cost: u64,
    /// Server-side page size for event listing
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl LifecycleConfig {
    pub fn settlement_mint(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.settlement_mint)
            .map_err(|_| anyhow::anyhow!("Invalid settlement_mint: {}", self.settlement_mint))
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_confirm_timeout_ms() -> u64 {
    60_000
}

fn default_confirm_poll_interval_ms() -> u64 {
    500
}

fn default_target_out_amount() -> u64 {
    1_000_000
}

fn default_page_limit() -> u32 {
    100
}

/// Largest page size accepted by the metadata API.
pub const MAX_PAGE_LIMIT: u32 = 1_000;

impl WorkflowConfig {
    /// Loads configuration from a TOML file.
    ///
    /// This function:
    /// 1. Uses the provided path, or SWAP_WORKFLOW_CONFIG_PATH, or config/workflow.toml
    /// 2. Parses the TOML
    /// 3. Validates the configuration
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to config file. If None, uses the env var or the default.
    ///
    /// # Returns
    ///
    /// * `Ok(WorkflowConfig)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, unparseable or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var("SWAP_WORKFLOW_CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/workflow.toml".to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/workflow.template.toml config/workflow.toml\n\
                Then edit config/workflow.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: WorkflowConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the lifecycle section or an error naming the missing table.
    pub fn lifecycle(&self) -> anyhow::Result<&LifecycleConfig> {
        self.lifecycle
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Configuration error: [lifecycle] section is required"))
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks:
    /// - API and RPC URLs are http(s)
    /// - Timeouts are positive and poll intervals respect the minimum poll delay
    /// - Default slippage is within 0..=10000 bps
    /// - Lifecycle amounts are positive and the settlement mint is a valid pubkey
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_url("service.trade_api_url", &self.service.trade_api_url)?;
        validate_url("service.metadata_api_url", &self.service.metadata_api_url)?;
        validate_url("chain.rpc_url", &self.chain.rpc_url)?;

        if self.service.request_timeout_ms == 0 || self.chain.request_timeout_ms == 0 {
            anyhow::bail!("Configuration error: request_timeout_ms must be positive");
        }

        if self.chain.private_key_env.trim().is_empty() {
            anyhow::bail!("Configuration error: chain.private_key_env must not be empty");
        }

        if self.chain.confirm_timeout_ms == 0 {
            anyhow::bail!("Configuration error: chain.confirm_timeout_ms must be positive");
        }
        if self.chain.confirm_poll_interval() < MIN_POLL_INTERVAL {
            anyhow::bail!(
                "Configuration error: chain.confirm_poll_interval_ms must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            );
        }

        if self.monitor.timeout_ms == 0 {
            anyhow::bail!("Configuration error: monitor.timeout_ms must be positive");
        }
        if self.monitor.poll_interval() < MIN_POLL_INTERVAL {
            anyhow::bail!(
                "Configuration error: monitor.poll_interval_ms must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            );
        }

        if self.trade.slippage_bps > MAX_SLIPPAGE_BPS {
            anyhow::bail!(
                "Configuration error: trade.slippage_bps {} exceeds {}",
                self.trade.slippage_bps,
                MAX_SLIPPAGE_BPS
            );
        }

        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.settlement_mint()?;
            if lifecycle.probe_amount == 0 {
                anyhow::bail!("Configuration error: lifecycle.probe_amount must be positive");
            }
            if lifecycle.target_out_amount == 0 {
                anyhow::bail!("Configuration error: lifecycle.target_out_amount must be positive");
            }
            if lifecycle.max_cost == 0 {
                anyhow::bail!("Configuration error: lifecycle.max_cost must be positive");
            }
            if lifecycle.page_limit == 0 || lifecycle.page_limit > MAX_PAGE_LIMIT {
                anyhow::bail!(
                    "Configuration error: lifecycle.page_limit must be between 1 and {}",
                    MAX_PAGE_LIMIT
                );
            }
        }

        Ok(())
    }
}

/// Validates that a URL setting is a non-empty http(s) URL.
fn validate_url(field: &str, url: &str) -> anyhow::Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Configuration error: {} must be an http(s) URL, got '{}'",
            field,
            url
        ))
    }
}
