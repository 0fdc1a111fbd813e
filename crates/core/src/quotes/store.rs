//! Quote storage traits.
//!
//! This module defines the storage interface for cached quotes. The trait
//! abstracts the persistence layer so the sync engine can run against SQLite
//! in production and in-memory mocks in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::model::{Quote, QuoteUpdate};
use crate::errors::Result;
use marketcache_market_data::AssetClass;

// =============================================================================
// Quote Store
// =============================================================================

/// Storage interface for cached quotes.
///
/// # Design Notes
///
/// - Reads are sync; they are single indexed lookups
/// - Writes are async and go through the storage layer's writer
/// - Each upsert touches exactly one row and is atomic on its own; no
///   transaction spans several symbols
/// - Merge rules come from [`Quote::upsert`] so every backend agrees on them
#[async_trait]
pub trait QuoteStore: Send + Sync {
    // =========================================================================
    // Queries
    // =========================================================================

    /// Point lookup by `(asset_class, symbol)`.
    fn get_quote(&self, asset_class: AssetClass, symbol: &str) -> Result<Option<Quote>>;

    /// Batch lookup. Symbols without a row are absent from the map.
    fn get_quotes(
        &self,
        asset_class: AssetClass,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>>;

    /// Most recent `last_updated` across the asset class, `None` when the class
    /// has never been refreshed.
    fn last_refresh_timestamp(&self, asset_class: AssetClass) -> Result<Option<DateTime<Utc>>>;

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert or merge a single symbol and return the stored row.
    async fn upsert_quote(&self, asset_class: AssetClass, update: QuoteUpdate) -> Result<Quote>;
}
