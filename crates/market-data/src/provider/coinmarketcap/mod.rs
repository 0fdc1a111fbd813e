//! CoinMarketCap provider for cryptocurrency market data.
//!
//! Crypto symbols are not unique on CoinMarketCap, so quotes are requested by
//! numeric catalog id. The provider exposes all three operations:
//! - `/v1/cryptocurrency/map` resolves symbols to ids
//! - `/v2/cryptocurrency/info` returns name and logo per id
//! - `/v2/cryptocurrency/quotes/latest` returns USD price and 24h change per id
//!
//! Authentication is a `X-CMC_PRO_API_KEY` header.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, AssetMetadata, InternalId, ProviderQuote};
use crate::provider::http::{build_client, join_symbols, lenient_number, parse_json, send};
use crate::provider::{CallKind, MarketDataProvider, ProviderCapabilities};

const PROVIDER_ID: &str = "COINMARKETCAP";
const BASE_URL: &str = "https://pro-api.coinmarketcap.com";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

const MAP_ENDPOINT: &str = "/v1/cryptocurrency/map";
const INFO_ENDPOINT: &str = "/v2/cryptocurrency/info";
const QUOTES_ENDPOINT: &str = "/v2/cryptocurrency/quotes/latest";

/// Quote currency requested from the quotes endpoint.
const CONVERT: &str = "USD";

// ============================================================================
// Response types
// ============================================================================

/// Envelope status block present on every CoinMarketCap response.
#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Status,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct MapEntry {
    id: i64,
    symbol: String,
    #[serde(default)]
    rank: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InfoEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    symbol: String,
    #[serde(default)]
    quote: HashMap<String, QuoteValues>,
}

#[derive(Debug, Deserialize)]
struct QuoteValues {
    #[serde(default)]
    price: Value,
    #[serde(default)]
    percent_change_24h: Value,
}

// ============================================================================
// Provider
// ============================================================================

/// CoinMarketCap market data provider.
///
/// # Example
///
/// ```ignore
/// use marketcache_market_data::provider::coinmarketcap::CoinMarketCapProvider;
///
/// let provider = CoinMarketCapProvider::new("your_api_key".to_string());
/// ```
pub struct CoinMarketCapProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CoinMarketCapProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_client(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the provider at another host, e.g. the sandbox API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, MarketDataError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let request = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .query(query);
        send(PROVIDER_ID, endpoint, request).await
    }
}

/// Unwrap the envelope, mapping API-level error codes.
fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, MarketDataError> {
    match envelope.status.error_code {
        0 => {}
        // Invalid, missing or disabled key
        1001 | 1002 | 1005 | 1006 | 1007 => {
            return Err(MarketDataError::Unauthorized {
                provider: PROVIDER_ID.to_string(),
                status: None,
            })
        }
        // Minute, daily and monthly rate limits
        1008 | 1009 | 1010 | 1011 => {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            })
        }
        code => {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: envelope
                    .status
                    .error_message
                    .unwrap_or_else(|| format!("error code {}", code)),
            })
        }
    }

    envelope.data.ok_or_else(|| MarketDataError::ValidationFailed {
        message: "missing data object".to_string(),
    })
}

/// Pick one id per requested symbol. Lower rank wins; unranked entries lose.
fn parse_map(body: &str, requested: &[String]) -> Result<HashMap<String, InternalId>, MarketDataError> {
    let entries: Vec<MapEntry> = unwrap_envelope(parse_json(PROVIDER_ID, body)?)?;

    let mut best: HashMap<String, (i64, i64)> = HashMap::new();
    for entry in entries {
        let symbol = entry.symbol.to_uppercase();
        let rank = entry.rank.unwrap_or(i64::MAX);
        let better = best
            .get(&symbol)
            .map_or(true, |(_, current)| rank < *current);
        if better {
            best.insert(symbol, (entry.id, rank));
        }
    }

    Ok(requested
        .iter()
        .filter_map(|symbol| {
            best.get(&symbol.to_uppercase())
                .map(|(id, _)| (symbol.clone(), id.to_string()))
        })
        .collect())
}

fn parse_info(body: &str) -> Result<HashMap<InternalId, AssetMetadata>, MarketDataError> {
    let data: HashMap<String, InfoEntry> = unwrap_envelope(parse_json(PROVIDER_ID, body)?)?;

    Ok(data
        .into_iter()
        .map(|(id, info)| {
            let name = info.name.filter(|n| !n.trim().is_empty());
            let logo = info.logo.filter(|l| !l.trim().is_empty());
            (id, AssetMetadata::new(name, logo))
        })
        .collect())
}

fn parse_quotes(body: &str) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
    let data: HashMap<String, QuoteEntry> = unwrap_envelope(parse_json(PROVIDER_ID, body)?)?;

    Ok(data
        .into_iter()
        .map(|(id, entry)| {
            let values = entry.quote.get(CONVERT);
            let price = values.and_then(|v| lenient_number(&v.price));
            let change = values.and_then(|v| lenient_number(&v.percent_change_24h));
            (id, ProviderQuote::new(entry.symbol, price, change))
        })
        .collect())
}

#[async_trait]
impl MarketDataProvider for CoinMarketCapProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_class: AssetClass::Crypto,
            resolves_ids: true,
            supports_metadata: true,
        }
    }

    fn endpoint(&self, kind: CallKind) -> &'static str {
        match kind {
            CallKind::Ids => MAP_ENDPOINT,
            CallKind::Metadata => INFO_ENDPOINT,
            CallKind::Quotes => QUOTES_ENDPOINT,
        }
    }

    async fn resolve_ids(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, InternalId>, MarketDataError> {
        let body = self
            .get(MAP_ENDPOINT, &[("symbol", join_symbols(symbols))])
            .await?;
        let ids = parse_map(&body, symbols)?;
        debug!(requested = symbols.len(), resolved = ids.len(), "Resolved CoinMarketCap ids");
        Ok(ids)
    }

    async fn fetch_metadata(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, AssetMetadata>, MarketDataError> {
        let body = self
            .get(
                INFO_ENDPOINT,
                &[("id", ids.join(",")), ("aux", "logo".to_string())],
            )
            .await?;
        parse_info(&body)
    }

    async fn fetch_quotes(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
        let body = self
            .get(
                QUOTES_ENDPOINT,
                &[("id", ids.join(",")), ("convert", CONVERT.to_string())],
            )
            .await?;
        parse_quotes(&body)
    }
}
