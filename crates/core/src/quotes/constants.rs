//! Quote synchronization constants.

use std::time::Duration as StdDuration;

/// Provider identifiers, also the usage ledger partition keys.
pub const PROVIDER_FMP: &str = "FMP";
pub const PROVIDER_COINMARKETCAP: &str = "COINMARKETCAP";
pub const PROVIDER_METAL_PRICE_API: &str = "METAL_PRICE_API";

/// Contractual monthly call limits of the free plans.
pub const FMP_MONTHLY_LIMIT: u64 = 100;
pub const COINMARKETCAP_MONTHLY_LIMIT: u64 = 300;
pub const METAL_PRICE_API_MONTHLY_LIMIT: u64 = 100;

/// Hard stop as a percentage of the monthly limit. The remainder is a safety
/// buffer for calls made outside the engine.
pub const HARD_STOP_PERCENT: u64 = 95;

/// Soft warning as a percentage of the monthly limit.
pub const WARNING_PERCENT: u64 = 85;

/// Minimum hours between two refresh cycles, per asset class.
pub const STOCKS_MIN_INTERVAL_HOURS: i64 = 8;
pub const CRYPTO_MIN_INTERVAL_HOURS: i64 = 4;
pub const COMMODITIES_MIN_INTERVAL_HOURS: i64 = 12;

/// Name and logo are re-fetched once they are older than this.
pub const METADATA_TTL_DAYS: i64 = 7;

/// Pause between two per-symbol upserts.
pub const DEFAULT_WRITE_DELAY: StdDuration = StdDuration::from_millis(50);
