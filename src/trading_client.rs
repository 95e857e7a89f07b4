//! Trading API Client
//!
//! HTTP client for the trading API: imperative quotes (`GET /order`), declarative
//! intents (`GET /intent`) and intent submission (`POST /submit-intent`).
//!
//! Non-2xx responses become `WorkflowError::Api` with the `{ code, msg }` body mapped onto
//! `ApiErrorCode`. A 2xx response that is empty or cannot be decoded is always
//! `WorkflowError::MalformedResponse`. Nothing here retries.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Deserializer, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{ApiErrorCode, WorkflowError};
use crate::types::{Intent, OrderSubmission, QuoteResult, TradeRequest};

/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "x-api-key";

// ============================================================================
// WIRE STRUCTURES
// ============================================================================

/// Response of `GET /order`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default, deserialize_with = "optional_amount")]
    in_amount: Option<u64>,
    #[serde(default, deserialize_with = "optional_amount")]
    out_amount: Option<u64>,
    #[serde(default, deserialize_with = "optional_amount")]
    last_valid_block_height: Option<u64>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Response of `GET /intent`; the full payload is kept separately for echoing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentResponse {
    #[serde(default)]
    open_transaction: Option<String>,
    #[serde(default, deserialize_with = "optional_amount")]
    in_amount: Option<u64>,
    #[serde(default, deserialize_with = "optional_amount")]
    out_amount: Option<u64>,
    #[serde(default, deserialize_with = "optional_amount")]
    last_valid_block_height: Option<u64>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Body of `POST /submit-intent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitIntentRequest<'a> {
    quote_response: &'a serde_json::Value,
    signed_open_transaction: String,
}

/// Response of `POST /submit-intent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitIntentResponse {
    order_address: String,
    program_id: String,
}

/// Amounts arrive either as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(u64),
    Text(String),
}

pub(crate) fn optional_amount<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<AmountRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(AmountRepr::Number(n)) => Ok(Some(n)),
        Some(AmountRepr::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid amount '{}'", s))),
    }
}

// ============================================================================
// SHARED RESPONSE HANDLING
// ============================================================================

/// Reads a response body, converting non-2xx statuses and empty bodies into errors.
///
/// # Returns
///
/// * `Ok(String)` - Non-empty body of a 2xx response
/// * `Err(WorkflowError::Api)` - Non-2xx status (structured code when present)
/// * `Err(WorkflowError::MalformedResponse)` - 2xx status with an empty body
pub(crate) async fn read_api_body(endpoint: &str, response: Response) -> Result<String, WorkflowError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WorkflowError::network(endpoint, e))?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Err(WorkflowError::malformed(endpoint, "empty response body"));
    }
    Ok(body)
}

/// Builds an `Api` error from a non-2xx body.
///
/// A JSON object with a `code` field (string or number) yields a typed code and the
/// `msg`/`message`/`error` text; anything else is surfaced as raw text.
pub(crate) fn api_error(status: u16, body: &str) -> WorkflowError {
    let structured = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            let code = match value.get("code")? {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let message = ["msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|m| m.as_str()))
                .unwrap_or(code.as_str())
                .to_string();
            Some((code, message))
        });

    match structured {
        Some((code, message)) => WorkflowError::Api {
            status,
            code: ApiErrorCode::from_code(&code),
            message,
        },
        None => WorkflowError::Api {
            status,
            code: ApiErrorCode::Unstructured,
            message: body.to_string(),
        },
    }
}

/// Transaction bytes of a 2xx quote, or the failure its `errorCode` reports.
///
/// A response without a transaction but with an `errorCode` is a typed `Api` error (e.g.
/// zero output amount); without either it is malformed.
fn transaction_or_error(
    endpoint: &str,
    field: &str,
    status: u16,
    encoded: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
) -> Result<Vec<u8>, WorkflowError> {
    let has_transaction = encoded.as_deref().is_some_and(|s| !s.trim().is_empty());
    match error_code.filter(|c| !c.trim().is_empty()) {
        Some(code) if !has_transaction => Err(WorkflowError::Api {
            status,
            code: ApiErrorCode::from_code(&code),
            message: error_message.unwrap_or(code),
        }),
        _ => decode_transaction(endpoint, field, encoded),
    }
}

/// Decodes a base64 transaction field, rejecting missing or empty payloads.
fn decode_transaction(endpoint: &str, field: &str, encoded: Option<String>) -> Result<Vec<u8>, WorkflowError> {
    let encoded = encoded
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| WorkflowError::malformed(endpoint, format!("missing {}", field)))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| WorkflowError::malformed(endpoint, format!("{} is not valid base64: {}", field, e)))?;
    if bytes.is_empty() {
        return Err(WorkflowError::malformed(endpoint, format!("{} is empty", field)));
    }
    Ok(bytes)
}

// ============================================================================
// TRADING API CLIENT
// ============================================================================

/// HTTP client for the trading API.
#[derive(Clone)]
pub struct TradingApiClient {
    /// Base URL, e.g. "https://quote-api.example.net"
    base_url: String,
    /// Optional API key sent as `x-api-key`
    api_key: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl TradingApiClient {
    /// Creates a new trading API client.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration (base URL, API key, timeout)
    ///
    /// # Returns
    ///
    /// * `Ok(TradingApiClient)` - New client instance
    /// * `Err(anyhow::Error)` - HTTP client could not be built
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.trade_api_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            client,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Sends a GET for `request` and returns the HTTP status with the non-empty 2xx body.
    async fn get_body(
        &self,
        endpoint: &str,
        request: &TradeRequest,
    ) -> Result<(u16, String), WorkflowError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(
            "GET {} {} -> {} amount={} slippage_bps={}",
            endpoint,
            request.input_mint(),
            request.output_mint(),
            request.amount(),
            request.slippage_bps()
        );

        let response = self
            .authorized(self.client.get(&url).query(&request.query_params()))
            .send()
            .await
            .map_err(|e| WorkflowError::network(endpoint, e))?;

        let status = response.status().as_u16();
        let body = read_api_body(endpoint, response).await?;
        Ok((status, body))
    }

    /// Requests an executable swap quote.
    ///
    /// # Returns
    ///
    /// * `Ok(QuoteResult)` - Quote with a non-empty unsigned transaction
    /// * `Err(WorkflowError::Api)` - Non-2xx status, or a 2xx body carrying `errorCode`
    /// * `Err(WorkflowError)` - Network or malformed-response failure
    pub async fn request_quote(&self, request: &TradeRequest) -> Result<QuoteResult, WorkflowError> {
        const ENDPOINT: &str = "/order";
        let (status, body) = self.get_body(ENDPOINT, request).await?;

        let parsed: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| WorkflowError::malformed(ENDPOINT, e.to_string()))?;

        Ok(QuoteResult {
            transaction: transaction_or_error(
                ENDPOINT,
                "transaction",
                status,
                parsed.transaction,
                parsed.error_code,
                parsed.error_message,
            )?,
            in_amount: parsed.in_amount,
            out_amount: parsed.out_amount,
            last_valid_block_height: parsed.last_valid_block_height,
        })
    }

    /// Requests a declarative intent.
    ///
    /// The full response payload is kept in `Intent::payload` so it can be echoed back
    /// unchanged on submission.
    pub async fn request_intent(&self, request: &TradeRequest) -> Result<Intent, WorkflowError> {
        const ENDPOINT: &str = "/intent";
        let (status, body) = self.get_body(ENDPOINT, request).await?;

        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| WorkflowError::malformed(ENDPOINT, e.to_string()))?;
        if !payload.is_object() {
            return Err(WorkflowError::malformed(ENDPOINT, "expected a JSON object"));
        }
        let parsed: IntentResponse = serde_json::from_value(payload.clone())
            .map_err(|e| WorkflowError::malformed(ENDPOINT, e.to_string()))?;

        Ok(Intent {
            open_transaction: transaction_or_error(
                ENDPOINT,
                "openTransaction",
                status,
                parsed.open_transaction,
                parsed.error_code,
                parsed.error_message,
            )?,
            in_amount: parsed.in_amount,
            out_amount: parsed.out_amount,
            last_valid_block_height: parsed.last_valid_block_height,
            payload,
        })
    }

    /// Submits a signed opening transaction together with the original intent payload.
    ///
    /// # Arguments
    ///
    /// * `intent` - Intent as returned by `request_intent`; its payload is echoed verbatim
    /// * `signed_open_transaction` - Signed transaction bytes
    ///
    /// # Returns
    ///
    /// * `Ok(OrderSubmission)` - Order address and owning program
    /// * `Err(WorkflowError)` - Network, API or malformed-response failure
    pub async fn submit_intent(
        &self,
        intent: &Intent,
        signed_open_transaction: &[u8],
    ) -> Result<OrderSubmission, WorkflowError> {
        const ENDPOINT: &str = "/submit-intent";
        let url = format!("{}{}", self.base_url, ENDPOINT);

        let body = SubmitIntentRequest {
            quote_response: &intent.payload,
            signed_open_transaction: STANDARD.encode(signed_open_transaction),
        };

        let response = self
            .authorized(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| WorkflowError::network(ENDPOINT, e))?;

        let body = read_api_body(ENDPOINT, response).await?;
        let parsed: SubmitIntentResponse = serde_json::from_str(&body)
            .map_err(|e| WorkflowError::malformed(ENDPOINT, e.to_string()))?;

        let order_address = Pubkey::from_str(&parsed.order_address).map_err(|_| {
            WorkflowError::malformed(ENDPOINT, format!("invalid orderAddress '{}'", parsed.order_address))
        })?;
        let program_id = Pubkey::from_str(&parsed.program_id).map_err(|_| {
            WorkflowError::malformed(ENDPOINT, format!("invalid programId '{}'", parsed.program_id))
        })?;

        Ok(OrderSubmission {
            order_address,
            program_id,
        })
    }
}
