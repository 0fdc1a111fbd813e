use std::time::Duration;

const DEFAULT_DB_PATH: &str = "./data/marketcache.db";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60 * 60;

/// Settings for one provider, present only when its API key is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub symbols: Vec<String>,
    pub monthly_limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub sync_interval: Duration,
    pub run_once: bool,
    pub stocks: Option<ProviderSettings>,
    pub crypto: Option<ProviderSettings>,
    pub metals: Option<ProviderSettings>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("MC_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let sync_interval = lookup("MC_SYNC_INTERVAL_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS));
        let run_once = lookup("MC_RUN_ONCE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let provider = |key_var: &str, symbols_var: &str, limit_var: &str| {
            let api_key = lookup(key_var).filter(|k| !k.trim().is_empty())?;
            Some(ProviderSettings {
                api_key: api_key.trim().to_string(),
                symbols: lookup(symbols_var)
                    .map(|v| parse_symbols(&v))
                    .unwrap_or_default(),
                monthly_limit: lookup(limit_var).and_then(|v| v.trim().parse().ok()),
            })
        };

        Self {
            stocks: provider("MC_FMP_API_KEY", "MC_STOCK_SYMBOLS", "MC_FMP_MONTHLY_LIMIT"),
            crypto: provider("MC_CMC_API_KEY", "MC_CRYPTO_SYMBOLS", "MC_CMC_MONTHLY_LIMIT"),
            metals: provider(
                "MC_METAL_PRICE_API_KEY",
                "MC_METAL_SYMBOLS",
                "MC_METAL_PRICE_API_MONTHLY_LIMIT",
            ),
            db_path,
            sync_interval,
            run_once,
        }
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
