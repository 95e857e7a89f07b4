//! Prediction-Market Metadata Client
//!
//! Read-only client for the market discovery API: events with nested markets, per-market
//! orderbooks, tags and series. Event listing is exposed as a lazy paginated stream so a
//! catalogue of any size is walked one page at a time.

use anyhow::Context;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::WorkflowError;
use crate::trading_client::{optional_amount, read_api_body, API_KEY_HEADER};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Event grouping one or more markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub ticker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub series_ticker: Option<String>,
    /// Present when listed with nested markets
    #[serde(default)]
    pub markets: Vec<Market>,
}

/// A single binary (YES/NO) market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub ticker: String,
    #[serde(default)]
    pub title: String,
    /// Lifecycle status, e.g. "active", "closed", "determined"
    #[serde(default)]
    pub status: String,
    /// Traded volume in contracts
    #[serde(default, deserialize_with = "optional_amount")]
    pub volume: Option<u64>,
    /// Outcome mints keyed by settlement mint
    #[serde(default)]
    pub accounts: BTreeMap<String, MarketAccounts>,
}

/// Outcome token mints for one settlement currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAccounts {
    pub yes_mint: String,
    pub no_mint: String,
}

impl Market {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn volume(&self) -> u64 {
        self.volume.unwrap_or(0)
    }

    /// Returns the (YES, NO) outcome mints settled in `settlement_mint`.
    pub fn outcome_mints(&self, settlement_mint: &Pubkey) -> Option<(Pubkey, Pubkey)> {
        let accounts = self.accounts.get(&settlement_mint.to_string())?;
        let yes = Pubkey::from_str(&accounts.yes_mint).ok()?;
        let no = Pubkey::from_str(&accounts.no_mint).ok()?;
        Some((yes, no))
    }
}

/// One price level of an orderbook side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    /// Price as a probability in 0..=1
    pub price: f64,
    /// Contracts resting at this price
    pub size: u64,
}

/// Bids on both outcome sides, each sorted best (highest) first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Orderbook {
    pub yes_bids: Vec<PriceLevel>,
    pub no_bids: Vec<PriceLevel>,
}

/// Series of recurring events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub ticker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Filter and page size for event listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Server-side page size
    pub limit: u32,
    /// Only events in this status
    pub status: Option<String>,
    /// Only events in these series
    pub series_tickers: Vec<String>,
    /// Include nested markets
    pub with_nested_markets: bool,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            status: None,
            series_tickers: Vec::new(),
            with_nested_markets: true,
        }
    }
}

impl EventQuery {
    fn params(&self, cursor: Option<u64>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.to_string()),
            ("withNestedMarkets", self.with_nested_markets.to_string()),
        ];
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if !self.series_tickers.is_empty() {
            params.push(("seriesTickers", self.series_tickers.join(",")));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        params
    }
}

// Wire formats

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    cursor: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OrderbookResponse {
    #[serde(default, alias = "yesBids")]
    yes_bids: BTreeMap<String, serde_json::Value>,
    #[serde(default, alias = "noBids")]
    no_bids: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsResponse {
    #[serde(default)]
    tags_by_categories: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    series: Vec<Series>,
}

enum PageState {
    Start,
    Next(u64),
    Done,
}

// ============================================================================
// CLIENT
// ============================================================================

/// HTTP client for the metadata API.
#[derive(Clone)]
pub struct MetadataClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl MetadataClient {
    /// Creates a new metadata client from service configuration.
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.metadata_api_url.trim_end_matches('/').to_string(),
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

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, WorkflowError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .authorized(self.client.get(&url).query(params))
            .send()
            .await
            .map_err(|e| WorkflowError::network(endpoint, e))?;

        let body = read_api_body(endpoint, response).await?;
        serde_json::from_str(&body).map_err(|e| WorkflowError::malformed(endpoint, e.to_string()))
    }

    async fn events_page(&self, query: &EventQuery, cursor: Option<u64>) -> Result<EventsPage, WorkflowError> {
        debug!("Fetching events page (cursor: {:?}, limit: {})", cursor, query.limit);
        self.get_json("/api/v1/events", &query.params(cursor)).await
    }

    /// Lists events as a lazy stream, fetching one page of `query.limit` at a time.
    ///
    /// The stream ends after an empty page, a page shorter than the limit, or a page
    /// without a cursor. It is finite and restartable: every call starts from the first
    /// page. A failed page yields one `Err` item and ends the stream.
    pub fn events(&self, query: EventQuery) -> impl Stream<Item = Result<Event, WorkflowError>> + '_ {
        stream::try_unfold(PageState::Start, move |state| {
            let query = query.clone();
            async move {
                let cursor = match state {
                    PageState::Done => return Ok::<_, WorkflowError>(None),
                    PageState::Start => None,
                    PageState::Next(cursor) => Some(cursor),
                };

                let page = self.events_page(&query, cursor).await?;
                let full_page = page.events.len() >= query.limit as usize;
                let next = match page.cursor {
                    Some(next) if full_page && !page.events.is_empty() && Some(next) != cursor => {
                        PageState::Next(next)
                    }
                    _ => PageState::Done,
                };

                Ok(Some((page.events, next)))
            }
        })
        .map_ok(|events| stream::iter(events.into_iter().map(Ok::<Event, WorkflowError>)))
        .try_flatten()
    }

    /// Fetches the orderbook of a market.
    ///
    /// # Returns
    ///
    /// * `Ok(Orderbook)` - Bid ladders, best price first
    /// * `Err(WorkflowError::MalformedResponse)` - A price or size could not be parsed
    pub async fn orderbook(&self, market_ticker: &str) -> Result<Orderbook, WorkflowError> {
        let endpoint = format!("/api/v1/orderbook/{}", market_ticker);
        let response: OrderbookResponse = self.get_json(&endpoint, &[]).await?;

        Ok(Orderbook {
            yes_bids: parse_ladder(&endpoint, response.yes_bids)?,
            no_bids: parse_ladder(&endpoint, response.no_bids)?,
        })
    }

    /// Fetches tags grouped by category.
    pub async fn tags_by_categories(&self) -> Result<BTreeMap<String, Vec<String>>, WorkflowError> {
        let response: TagsResponse = self.get_json("/api/v1/tags_by_categories", &[]).await?;
        Ok(response.tags_by_categories)
    }

    /// Fetches series, optionally restricted to one category.
    pub async fn series(&self, category: Option<&str>) -> Result<Vec<Series>, WorkflowError> {
        let params: Vec<(&'static str, String)> = category
            .map(|c| vec![("category", c.to_string())])
            .unwrap_or_default();
        let response: SeriesResponse = self.get_json("/api/v1/series", &params).await?;
        Ok(response.series)
    }
}

/// Converts a price→size map into a ladder sorted best price first.
fn parse_ladder(
    endpoint: &str,
    levels: BTreeMap<String, serde_json::Value>,
) -> Result<Vec<PriceLevel>, WorkflowError> {
    let mut ladder = levels
        .into_iter()
        .map(|(price_text, size)| {
            let price = price_text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| WorkflowError::malformed(endpoint, format!("invalid price '{}'", price_text)))?;
            let size = match &size {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            }
            .ok_or_else(|| WorkflowError::malformed(endpoint, format!("invalid size at price {}", price_text)))?;
            Ok(PriceLevel { price, size })
        })
        .collect::<Result<Vec<_>, WorkflowError>>()?;

    ladder.sort_by(|a, b| b.price.total_cmp(&a.price));
    Ok(ladder)
}
