//! Marketcache Market Data Crate
//!
//! This crate provides the upstream side of the market cache: provider
//! clients and the retry executor that wraps every call to them.
//!
//! # Overview
//!
//! - Three asset classes: equities, crypto, commodities
//! - One provider per class: Financial Modeling Prep, CoinMarketCap, Metal Price API
//! - Batched operations only: one request per call category per cycle
//! - Exponential backoff with a steeper curve for rate-limit answers
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!                          |   Sync engine    |  (marketcache-core)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  RetryExecutor   |  (backoff, attempt budget)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    Provider      |  (ids, metadata, quotes)
//!                          +------------------+
//!                                  |
//!                                  v
//!                         +-------------------+
//!                         |  ProviderQuote /  |  (raw, unvalidated)
//!                         |  AssetMetadata    |
//!                         +-------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataProvider`] - Provider abstraction
//! - [`RetryExecutor`] - Backoff executor
//! - [`MarketDataError`] - Upstream failure with its [`RetryClass`]
//! - [`ProviderQuote`] - Raw price answer
//! - [`AssetMetadata`] - Display name and logo

pub mod errors;
pub mod models;
pub mod provider;
pub mod retry;

pub use errors::{MarketDataError, RetryClass};

pub use models::{AssetClass, AssetMetadata, InternalId, ProviderQuote};

// Re-export provider types
pub use provider::coinmarketcap::CoinMarketCapProvider;
pub use provider::fmp::FinancialModelingPrepProvider;
pub use provider::metal_price_api::MetalPriceApiProvider;
pub use provider::{CallKind, MarketDataProvider, ProviderCapabilities};

pub use retry::{RetryError, RetryExecutor, Retryable, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES};
