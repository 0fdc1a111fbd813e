//! Financial Modeling Prep provider for equity market data.
//!
//! FMP quotes by ticker, so no id resolution is needed and the symbol is used
//! as the internal id. Both endpoints accept a comma-separated symbol list in
//! the path, making every operation a single request.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, AssetMetadata, InternalId, ProviderQuote};
use crate::provider::http::{build_client, join_symbols, lenient_number, parse_json, send};
use crate::provider::{CallKind, MarketDataProvider, ProviderCapabilities};

const PROVIDER_ID: &str = "FMP";
const BASE_URL: &str = "https://financialmodelingprep.com";

const PROFILE_ENDPOINT: &str = "/api/v3/profile";
const QUOTE_ENDPOINT: &str = "/api/v3/quote";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpProfile {
    symbol: String,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    symbol: String,
    #[serde(default)]
    price: Value,
    #[serde(default)]
    changes_percentage: Value,
}

/// Financial Modeling Prep market data provider.
pub struct FinancialModelingPrepProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FinancialModelingPrepProvider {
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

    async fn fetch(&self, endpoint: &str, symbols: &[String]) -> Result<String, MarketDataError> {
        let url = format!("{}{}/{}", self.base_url, endpoint, join_symbols(symbols));
        let request = self.client.get(&url).query(&[("apikey", &self.api_key)]);
        send(PROVIDER_ID, endpoint, request).await
    }
}

/// FMP reports some failures as a 200 with an `{"Error Message": ...}` object
/// instead of an array.
fn check_error_object(value: &Value) -> Result<(), MarketDataError> {
    let Some(message) = value.get("Error Message").and_then(|m| m.as_str()) else {
        return Ok(());
    };

    let lower = message.to_lowercase();
    if lower.contains("invalid api key") {
        Err(MarketDataError::Unauthorized {
            provider: PROVIDER_ID.to_string(),
            status: None,
        })
    } else if lower.contains("limit reach") {
        Err(MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        })
    } else {
        Err(MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: message.to_string(),
        })
    }
}

fn parse_list<T: serde::de::DeserializeOwned>(body: &str) -> Result<Vec<T>, MarketDataError> {
    let value: Value = parse_json(PROVIDER_ID, body)?;
    check_error_object(&value)?;
    serde_json::from_value(value).map_err(|e| MarketDataError::ProviderError {
        provider: PROVIDER_ID.to_string(),
        message: format!("Unexpected response shape: {}", e),
    })
}

fn parse_profiles(body: &str) -> Result<HashMap<InternalId, AssetMetadata>, MarketDataError> {
    let profiles: Vec<FmpProfile> = parse_list(body)?;
    Ok(profiles
        .into_iter()
        .map(|p| {
            let name = p.company_name.filter(|n| !n.trim().is_empty());
            let logo = p.image.filter(|i| !i.trim().is_empty());
            (p.symbol, AssetMetadata::new(name, logo))
        })
        .collect())
}

fn parse_quotes(body: &str) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
    let quotes: Vec<FmpQuote> = parse_list(body)?;
    Ok(quotes
        .into_iter()
        .map(|q| {
            let price = lenient_number(&q.price);
            let change = lenient_number(&q.changes_percentage);
            (q.symbol.clone(), ProviderQuote::new(q.symbol, price, change))
        })
        .collect())
}

#[async_trait]
impl MarketDataProvider for FinancialModelingPrepProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_class: AssetClass::Equity,
            resolves_ids: false,
            supports_metadata: true,
        }
    }

    fn endpoint(&self, kind: CallKind) -> &'static str {
        match kind {
            // Tickers double as ids; never called.
            CallKind::Ids => QUOTE_ENDPOINT,
            CallKind::Metadata => PROFILE_ENDPOINT,
            CallKind::Quotes => QUOTE_ENDPOINT,
        }
    }

    async fn fetch_metadata(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, AssetMetadata>, MarketDataError> {
        let body = self.fetch(PROFILE_ENDPOINT, ids).await?;
        parse_profiles(&body)
    }

    async fn fetch_quotes(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
        let body = self.fetch(QUOTE_ENDPOINT, ids).await?;
        parse_quotes(&body)
    }
}
