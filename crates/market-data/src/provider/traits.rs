//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data providers must implement.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{AssetMetadata, InternalId, ProviderQuote};

use super::capabilities::{CallKind, ProviderCapabilities};

/// Trait for market data providers.
///
/// A provider exposes up to three batched operations. Every method issues at
/// most one upstream request for the whole batch, which is what lets the sync
/// engine reason about quota in calls per cycle.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use marketcache_market_data::provider::{CallKind, MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             asset_class: AssetClass::Equity,
///             resolves_ids: false,
///             supports_metadata: false,
///         }
///     }
///
///     fn endpoint(&self, kind: CallKind) -> &'static str {
///         "/v1/quotes"
///     }
///
///     // ... implement fetch_quotes
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "COINMARKETCAP", "FMP", etc.
    /// Used for logging and as the usage ledger partition key.
    fn id(&self) -> &'static str;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Upstream endpoint hit by a call category, recorded in the usage ledger.
    fn endpoint(&self, kind: CallKind) -> &'static str;

    /// Map symbols to provider catalog ids in one batched request.
    ///
    /// Symbols the provider does not know are absent from the returned map.
    async fn resolve_ids(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, InternalId>, MarketDataError> {
        let _ = symbols;
        Err(MarketDataError::NotSupported {
            operation: CallKind::Ids.to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch display metadata for the given ids in one batched request.
    async fn fetch_metadata(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, AssetMetadata>, MarketDataError> {
        let _ = ids;
        Err(MarketDataError::NotSupported {
            operation: CallKind::Metadata.to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch latest prices for the given ids in one batched request.
    ///
    /// Entries are returned as the provider sent them; a missing or
    /// non-numeric price is not an error at this level.
    async fn fetch_quotes(
        &self,
        ids: &[InternalId],
    ) -> Result<HashMap<InternalId, ProviderQuote>, MarketDataError>;
}
