/// Provider-specific catalog identifier (e.g. a CoinMarketCap coin id).
///
/// Kept as a string so numeric and textual catalogs share one representation.
pub type InternalId = String;
