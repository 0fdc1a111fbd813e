//! Metal Price API provider for commodity market data.
//!
//! The latest-rates endpoint answers "how many units of each metal does one
//! USD buy", so the price per unit is `1 / rate`. Common symbols:
//! - XAU (Gold)
//! - XAG (Silver)
//! - XPT (Platinum)
//! - XPD (Palladium)
//!
//! Note: The API reports no daily change and no display metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, InternalId, ProviderQuote};
use crate::provider::http::{build_client, join_symbols, lenient_number, parse_json, send};
use crate::provider::{CallKind, MarketDataProvider, ProviderCapabilities};

/// Provider ID constant
const PROVIDER_ID: &str = "METAL_PRICE_API";
const BASE_URL: &str = "https://api.metalpriceapi.com";
const LATEST_ENDPOINT: &str = "/v1/latest";
const BASE_CURRENCY: &str = "USD";

/// API response from Metal Price API
#[derive(Debug, Deserialize)]
struct MetalPriceResponse {
    /// Whether the request was successful
    success: bool,
    /// Rates for requested metals (1 base_currency = rate units)
    #[serde(default)]
    rates: HashMap<String, Value>,
    #[serde(default)]
    error: Option<MetalPriceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetalPriceError {
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// Metal Price API provider for commodity market data.
///
/// # Example
///
/// ```ignore
/// use marketcache_market_data::provider::metal_price_api::MetalPriceApiProvider;
///
/// let provider = MetalPriceApiProvider::new("your_api_key".to_string());
/// ```
pub struct MetalPriceApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MetalPriceApiProvider {
    /// Create a new Metal Price API provider with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_client(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_latest(
    body: &str,
    requested: &[InternalId],
) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
    let resp: MetalPriceResponse = parse_json(PROVIDER_ID, body)?;

    if !resp.success {
        let (status, message) = resp
            .error
            .map(|e| (e.status_code, e.message))
            .unwrap_or((None, None));
        return Err(match status {
            Some(429) => MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            },
            Some(code @ (401 | 403)) => MarketDataError::Unauthorized {
                provider: PROVIDER_ID.to_string(),
                status: Some(code),
            },
            _ => MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: message.unwrap_or_else(|| "API request failed".to_string()),
            },
        });
    }

    Ok(requested
        .iter()
        .filter_map(|symbol| {
            let rate = resp.rates.get(symbol)?;
            // A zero or negative rate has no meaningful inverse.
            let price = lenient_number(rate)
                .filter(|r| *r > 0.0)
                .map(|r| 1.0 / r);
            Some((symbol.clone(), ProviderQuote::new(symbol.clone(), price, None)))
        })
        .collect())
}

#[async_trait]
impl MarketDataProvider for MetalPriceApiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_class: AssetClass::Commodity,
            resolves_ids: false,
            supports_metadata: false,
        }
    }

    fn endpoint(&self, _kind: CallKind) -> &'static str {
        LATEST_ENDPOINT
    }

    async fn fetch_quotes(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
        let url = format!("{}{}", self.base_url, LATEST_ENDPOINT);
        let request = self.client.get(&url).query(&[
            ("api_key", self.api_key.clone()),
            ("base", BASE_CURRENCY.to_string()),
            ("currencies", join_symbols(ids)),
        ]);

        let body = send(PROVIDER_ID, LATEST_ENDPOINT, request).await?;
        parse_latest(&body, ids)
    }
}
