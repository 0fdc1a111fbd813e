use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;

use super::model::QuoteDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::market_quotes::dsl as quotes_dsl;
use crate::utils::{chunk_for_sqlite, parse_timestamp};
use marketcache_core::quotes::{Quote, QuoteStore, QuoteUpdate};
use marketcache_core::Result;
use marketcache_market_data::AssetClass;

pub struct MarketDataRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MarketDataRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn find_row(
    conn: &mut SqliteConnection,
    asset_class: &str,
    symbol: &str,
) -> std::result::Result<Option<QuoteDB>, diesel::result::Error> {
    quotes_dsl::market_quotes
        .filter(quotes_dsl::asset_class.eq(asset_class))
        .filter(quotes_dsl::symbol.eq(symbol))
        .select(QuoteDB::as_select())
        .first::<QuoteDB>(conn)
        .optional()
}

// =============================================================================
// QuoteStore Implementation
// =============================================================================

#[async_trait]
impl QuoteStore for MarketDataRepository {
    fn get_quote(&self, asset_class: AssetClass, symbol: &str) -> Result<Option<Quote>> {
        let mut conn = get_connection(&self.pool)?;

        find_row(&mut conn, asset_class.as_str(), symbol)
            .into_core()?
            .map(Quote::try_from)
            .transpose()
    }

    fn get_quotes(
        &self,
        asset_class: AssetClass,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = get_connection(&self.pool)?;
        let mut result = HashMap::with_capacity(symbols.len());

        for chunk in chunk_for_sqlite(symbols) {
            let rows = quotes_dsl::market_quotes
                .filter(quotes_dsl::asset_class.eq(asset_class.as_str()))
                .filter(quotes_dsl::symbol.eq_any(chunk))
                .select(QuoteDB::as_select())
                .load::<QuoteDB>(&mut conn)
                .into_core()?;

            for row in rows {
                let quote = Quote::try_from(row)?;
                result.insert(quote.symbol.clone(), quote);
            }
        }

        Ok(result)
    }

    fn last_refresh_timestamp(&self, asset_class: AssetClass) -> Result<Option<DateTime<Utc>>> {
        let mut conn = get_connection(&self.pool)?;

        let latest: Option<String> = quotes_dsl::market_quotes
            .filter(quotes_dsl::asset_class.eq(asset_class.as_str()))
            .select(diesel::dsl::max(quotes_dsl::last_updated))
            .first::<Option<String>>(&mut conn)
            .into_core()?;

        latest.as_deref().map(parse_timestamp).transpose()
    }

    async fn upsert_quote(&self, asset_class: AssetClass, update: QuoteUpdate) -> Result<Quote> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Quote> {
                let existing = find_row(conn, asset_class.as_str(), &update.symbol)
                    .map_err(StorageError::QueryFailed)?
                    .map(Quote::try_from)
                    .transpose()?;

                let merged = Quote::upsert(asset_class, existing.as_ref(), &update);

                diesel::replace_into(quotes_dsl::market_quotes)
                    .values(QuoteDB::from(&merged))
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;

                Ok(merged)
            })
            .await
    }
}
