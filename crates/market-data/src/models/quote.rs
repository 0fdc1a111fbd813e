use serde::{Deserialize, Serialize};

/// A price observation as returned by a provider, before validation.
///
/// `price` is kept as the raw float the provider sent. Providers do not
/// filter out missing or non-finite prices; the sync engine decides what
/// to do with them per symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderQuote {
    pub symbol: String,
    pub price: Option<f64>,
    /// Percent change over the provider's reference window (24h, previous close).
    pub percent_change: Option<f64>,
}

impl ProviderQuote {
    pub fn new(symbol: impl Into<String>, price: Option<f64>, percent_change: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            percent_change,
        }
    }
}

/// Slow-changing display data for an asset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: Option<String>,
    pub logo_url: Option<String>,
}

impl AssetMetadata {
    pub fn new(name: Option<String>, logo_url: Option<String>) -> Self {
        Self { name, logo_url }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.logo_url.is_none()
    }
}
