//! Per-symbol validation of provider answers.
//!
//! A rejected symbol becomes a per-item failure with the returned reason;
//! it never aborts the rest of the batch.

use rust_decimal::Decimal;

use marketcache_market_data::ProviderQuote;

/// Decimal places kept from provider floats.
const PRICE_SCALE: u32 = 8;

/// Price fields ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPrice {
    pub price: Decimal,
    pub percent_change: Option<Decimal>,
}

/// Check that a provider answer carries a usable price.
///
/// Rules:
/// - the symbol must be present in the response
/// - the price must be present, finite and strictly positive
/// - a non-finite percent change is dropped rather than rejected
pub fn validate_quote(quote: Option<&ProviderQuote>) -> Result<ValidatedPrice, String> {
    let quote = quote.ok_or_else(|| "No quote returned by provider".to_string())?;

    let raw = quote
        .price
        .ok_or_else(|| "Missing price in provider response".to_string())?;

    if raw.is_nan() {
        return Err("Price is NaN".to_string());
    }
    if raw.is_infinite() {
        return Err("Price is not finite".to_string());
    }
    if raw <= 0.0 {
        return Err(format!("Price must be positive, got {}", raw));
    }

    let price = to_decimal(raw).ok_or_else(|| format!("Price {} is out of range", raw))?;
    let percent_change = quote
        .percent_change
        .filter(|c| c.is_finite())
        .and_then(to_decimal);

    Ok(ValidatedPrice {
        price,
        percent_change,
    })
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value)
        .ok()
        .map(|d| d.round_dp(PRICE_SCALE).normalize())
}
