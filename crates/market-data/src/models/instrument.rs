use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset class a provider serves.
///
/// Each class is cached under its own key space: the same ticker may exist
/// as an equity and as a crypto asset without colliding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    Equity,
    Crypto,
    Commodity,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [AssetClass::Equity, AssetClass::Crypto, AssetClass::Commodity];

    /// Storage key for this asset class.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "EQUITY",
            AssetClass::Crypto => "CRYPTO",
            AssetClass::Commodity => "COMMODITY",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EQUITY" | "STOCK" | "STOCKS" => Ok(AssetClass::Equity),
            "CRYPTO" => Ok(AssetClass::Crypto),
            "COMMODITY" | "METAL" | "METALS" => Ok(AssetClass::Commodity),
            other => Err(format!("Unknown asset class: {}", other)),
        }
    }
}
