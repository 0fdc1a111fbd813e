//! Domain models for cached quotes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketcache_market_data::AssetClass;

/// A cached quote row.
///
/// Identity is `(asset_class, symbol)`. Price fields and metadata fields are
/// refreshed on independent cadences, so each carries its own timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub asset_class: AssetClass,
    pub symbol: String,
    pub display_name: String,
    pub logo_url: Option<String>,
    pub price: Decimal,
    pub percent_change: Option<Decimal>,
    /// Provider catalog id, resolved once and kept indefinitely.
    pub provider_internal_id: Option<String>,
    /// Time of the most recent successful price write.
    pub last_updated: DateTime<Utc>,
    /// Time of the most recent successful metadata write.
    pub metadata_updated_at: Option<DateTime<Utc>>,
}

/// Metadata fetched this cycle for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub display_name: Option<String>,
    pub logo_url: Option<String>,
}

/// Fields written for one symbol by a sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteUpdate {
    pub symbol: String,
    pub price: Decimal,
    pub percent_change: Option<Decimal>,
    /// Only set when the id was resolved this cycle.
    pub provider_internal_id: Option<String>,
    /// Only set when metadata was fetched this cycle.
    pub metadata: Option<MetadataUpdate>,
    pub updated_at: DateTime<Utc>,
}

impl QuoteUpdate {
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        percent_change: Option<Decimal>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            percent_change,
            provider_internal_id: None,
            metadata: None,
            updated_at,
        }
    }

    pub fn with_internal_id(mut self, id: impl Into<String>) -> Self {
        self.provider_internal_id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataUpdate) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl Quote {
    /// Build a brand-new row from an update. Without metadata the symbol
    /// doubles as display name.
    pub fn from_update(asset_class: AssetClass, update: &QuoteUpdate) -> Self {
        let (display_name, logo_url, metadata_updated_at) = match &update.metadata {
            Some(meta) => (
                meta.display_name
                    .clone()
                    .unwrap_or_else(|| update.symbol.clone()),
                meta.logo_url.clone(),
                Some(update.updated_at),
            ),
            None => (update.symbol.clone(), None, None),
        };

        Self {
            asset_class,
            symbol: update.symbol.clone(),
            display_name,
            logo_url,
            price: update.price,
            percent_change: update.percent_change,
            provider_internal_id: update.provider_internal_id.clone(),
            last_updated: update.updated_at,
            metadata_updated_at,
        }
    }

    /// Apply an update to an existing row.
    ///
    /// Price fields are always replaced. The internal id is only replaced when
    /// the update carries one. Metadata fields and `metadata_updated_at` are
    /// left alone unless the update carries metadata; fetched values that came
    /// back empty keep the existing value.
    pub fn merged(&self, update: &QuoteUpdate) -> Self {
        let mut next = self.clone();
        next.price = update.price;
        next.percent_change = update.percent_change;
        next.last_updated = update.updated_at;

        if let Some(id) = &update.provider_internal_id {
            next.provider_internal_id = Some(id.clone());
        }

        if let Some(meta) = &update.metadata {
            if let Some(name) = &meta.display_name {
                next.display_name = name.clone();
            }
            if let Some(logo) = &meta.logo_url {
                next.logo_url = Some(logo.clone());
            }
            next.metadata_updated_at = Some(update.updated_at);
        }

        next
    }

    /// Upsert semantics shared by every store: merge into `existing` or create.
    pub fn upsert(asset_class: AssetClass, existing: Option<&Quote>, update: &QuoteUpdate) -> Self {
        match existing {
            Some(quote) => quote.merged(update),
            None => Self::from_update(asset_class, update),
        }
    }
}
