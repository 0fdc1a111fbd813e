//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and call categories
//! - Concrete provider implementations (CoinMarketCap, FMP, Metal Price API)
//!
//! Providers only translate between the three logical operations
//! (ids, metadata, quotes) and their wire formats. Retry, quota accounting and
//! validation happen in the sync engine.

mod capabilities;
mod http;
mod traits;

pub mod coinmarketcap;
pub mod fmp;
pub mod metal_price_api;

// Re-exports
pub use capabilities::{CallKind, ProviderCapabilities};
pub use traits::MarketDataProvider;
