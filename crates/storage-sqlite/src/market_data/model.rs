//! Database model for cached quotes.

use diesel::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::utils::{format_timestamp, parse_timestamp};
use marketcache_core::errors::{Error, ValidationError};
use marketcache_core::quotes::Quote;
use marketcache_market_data::AssetClass;

/// Row of `market_quotes`. Decimals and timestamps are kept as text.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::market_quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuoteDB {
    pub asset_class: String,
    pub symbol: String,
    pub display_name: String,
    pub logo_url: Option<String>,
    pub price: String,
    pub percent_change: Option<String>,
    pub provider_internal_id: Option<String>,
    pub last_updated: String,
    pub metadata_updated_at: Option<String>,
}

impl From<&Quote> for QuoteDB {
    fn from(quote: &Quote) -> Self {
        Self {
            asset_class: quote.asset_class.as_str().to_string(),
            symbol: quote.symbol.clone(),
            display_name: quote.display_name.clone(),
            logo_url: quote.logo_url.clone(),
            price: quote.price.to_string(),
            percent_change: quote.percent_change.map(|d| d.to_string()),
            provider_internal_id: quote.provider_internal_id.clone(),
            last_updated: format_timestamp(&quote.last_updated),
            metadata_updated_at: quote.metadata_updated_at.as_ref().map(format_timestamp),
        }
    }
}

impl TryFrom<QuoteDB> for Quote {
    type Error = Error;

    fn try_from(row: QuoteDB) -> Result<Self, Self::Error> {
        let asset_class = AssetClass::from_str(&row.asset_class)
            .map_err(|e| Error::Validation(ValidationError::InvalidInput(e)))?;

        Ok(Quote {
            asset_class,
            price: Decimal::from_str(&row.price)?,
            percent_change: row
                .percent_change
                .as_deref()
                .map(Decimal::from_str)
                .transpose()?,
            last_updated: parse_timestamp(&row.last_updated)?,
            metadata_updated_at: row
                .metadata_updated_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            symbol: row.symbol,
            display_name: row.display_name,
            logo_url: row.logo_url,
            provider_internal_id: row.provider_internal_id,
        })
    }
}
