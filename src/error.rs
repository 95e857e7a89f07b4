//! Workflow error taxonomy
//!
//! Every fallible step of the quote → sign → submit → monitor sequence maps onto one of
//! these variants, so callers can branch on the kind of failure instead of parsing text.

use std::fmt;
use std::time::Duration;

use crate::types::OrderStatus;

/// Error code reported by the trading API in a non-2xx `{ code, msg }` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// The route would produce zero output tokens
    ZeroOutputAmount,
    /// No route with enough liquidity exists for the requested size
    InsufficientLiquidity,
    /// Any other structured code, kept verbatim
    Other(String),
    /// The body was not structured JSON with a `code` field
    Unstructured,
}

impl ApiErrorCode {
    /// Maps a raw `code` string onto a known variant.
    ///
    /// Matching ignores case and treats `_` and `-` as spaces, so `ZERO_OUTPUT_AMOUNT`,
    /// `zero-output-amount` and `Zero output amount` are the same code.
    pub fn from_code(code: &str) -> Self {
        let normalized: String = code
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.as_str() {
            "zero output amount" | "zero out amount" => ApiErrorCode::ZeroOutputAmount,
            "insufficient liquidity" | "route not found" => ApiErrorCode::InsufficientLiquidity,
            _ => ApiErrorCode::Other(code.to_string()),
        }
    }

    /// True for codes that describe a market condition rather than a fault.
    pub fn is_no_trade(&self) -> bool {
        matches!(
            self,
            ApiErrorCode::ZeroOutputAmount | ApiErrorCode::InsufficientLiquidity
        )
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorCode::ZeroOutputAmount => write!(f, "zero output amount"),
            ApiErrorCode::InsufficientLiquidity => write!(f, "insufficient liquidity"),
            ApiErrorCode::Other(code) => write!(f, "{}", code),
            ApiErrorCode::Unstructured => write!(f, "unstructured"),
        }
    }
}

/// Errors produced by the workflow components.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Transport failure: no HTTP response was received
    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// The remote API answered with a non-2xx status
    #[error("API error (HTTP {status}, code: {code}): {message}")]
    Api {
        status: u16,
        code: ApiErrorCode,
        message: String,
    },

    /// A 2xx response that was empty or could not be decoded
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// Trade parameters violate a request invariant
    #[error("invalid trade request: {0}")]
    InvalidRequest(String),

    /// Wallet key could not be loaded; never carries key material
    #[error("wallet key error: {0}")]
    Key(String),

    /// Transaction could not be decoded, signed or re-encoded
    #[error("signing error: {0}")]
    Signing(String),

    /// The chain RPC returned a JSON-RPC error object
    #[error("RPC error from {method}: {message}")]
    Rpc { method: String, message: String },

    /// The transaction landed but failed on-chain
    #[error("transaction {signature} failed on-chain: {error}")]
    TransactionFailed { signature: String, error: String },

    /// The transaction was not confirmed before the confirmation deadline
    #[error("transaction {signature} not confirmed within {waited:?}")]
    ConfirmTimeout { signature: String, waited: Duration },

    /// Client-side giving-up while waiting for a terminal order status
    #[error("order {order_address} did not reach a terminal status within {waited:?}")]
    MonitorTimeout {
        order_address: String,
        waited: Duration,
        last_status: Option<OrderStatus>,
    },
}

impl WorkflowError {
    /// True for the API errors that mean "no trade possible right now".
    pub fn is_no_trade(&self) -> bool {
        matches!(self, WorkflowError::Api { code, .. } if code.is_no_trade())
    }

    pub(crate) fn network(endpoint: &str, err: impl fmt::Display) -> Self {
        WorkflowError::Network {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
        WorkflowError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_normalizes_separators_and_case() {
        assert_eq!(ApiErrorCode::from_code("ZERO_OUTPUT_AMOUNT"), ApiErrorCode::ZeroOutputAmount);
        assert_eq!(ApiErrorCode::from_code("zero-out-amount"), ApiErrorCode::ZeroOutputAmount);
        assert_eq!(
            ApiErrorCode::from_code("Insufficient Liquidity"),
            ApiErrorCode::InsufficientLiquidity
        );
        assert_eq!(ApiErrorCode::from_code("route_not_found"), ApiErrorCode::InsufficientLiquidity);
    }

    #[test]
    fn test_from_code_keeps_unknown_codes_verbatim() {
        assert_eq!(
            ApiErrorCode::from_code("RATE_LIMITED"),
            ApiErrorCode::Other("RATE_LIMITED".to_string())
        );
        assert!(!ApiErrorCode::from_code("RATE_LIMITED").is_no_trade());
    }
}
