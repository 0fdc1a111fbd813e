//! Per-provider sync policy.
//!
//! One [`ProviderConfig`] parameterizes the shared gatekeeper, planner and
//! retry executor for a single provider. Thresholds, intervals and TTLs differ
//! per provider; the algorithms do not.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration as StdDuration;

use super::constants::*;
use crate::errors::{Result, ValidationError};
use marketcache_market_data::{AssetClass, RetryExecutor, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES};

/// What the gatekeeper does when the usage ledger cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerFailurePolicy {
    /// Treat usage as zero and flag the decision with a warning.
    #[default]
    FailOpen,
    /// Deny the refresh.
    FailClosed,
}

/// Retry settings for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_retries: u32,
    pub initial_delay: StdDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn executor(&self) -> RetryExecutor {
        RetryExecutor::new(self.max_retries, self.initial_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub asset_class: AssetClass,
    pub symbols: Vec<String>,
    pub monthly_limit: u64,
    /// Usage at which refreshes are denied. Strictly below `monthly_limit`.
    pub hard_stop_threshold: u64,
    /// Usage at which refreshes proceed with a warning.
    pub warning_threshold: u64,
    pub minimum_interval: Duration,
    pub metadata_ttl: Duration,
    pub retry: RetryPolicy,
    pub write_delay: StdDuration,
    pub ledger_failure_policy: LedgerFailurePolicy,
}

impl ProviderConfig {
    pub fn new(
        provider_id: impl Into<String>,
        asset_class: AssetClass,
        symbols: Vec<String>,
        monthly_limit: u64,
        minimum_interval: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            asset_class,
            symbols,
            monthly_limit,
            hard_stop_threshold: percent_of(monthly_limit, HARD_STOP_PERCENT),
            warning_threshold: percent_of(monthly_limit, WARNING_PERCENT),
            minimum_interval,
            metadata_ttl: Duration::days(METADATA_TTL_DAYS),
            retry: RetryPolicy::default(),
            write_delay: DEFAULT_WRITE_DELAY,
            ledger_failure_policy: LedgerFailurePolicy::default(),
        }
    }

    /// Equities through Financial Modeling Prep.
    pub fn stocks(symbols: Vec<String>) -> Self {
        Self::new(
            PROVIDER_FMP,
            AssetClass::Equity,
            symbols,
            FMP_MONTHLY_LIMIT,
            Duration::hours(STOCKS_MIN_INTERVAL_HOURS),
        )
    }

    /// Crypto through CoinMarketCap.
    pub fn crypto(symbols: Vec<String>) -> Self {
        Self::new(
            PROVIDER_COINMARKETCAP,
            AssetClass::Crypto,
            symbols,
            COINMARKETCAP_MONTHLY_LIMIT,
            Duration::hours(CRYPTO_MIN_INTERVAL_HOURS),
        )
    }

    /// Precious metals through Metal Price API.
    pub fn commodities(symbols: Vec<String>) -> Self {
        Self::new(
            PROVIDER_METAL_PRICE_API,
            AssetClass::Commodity,
            symbols,
            METAL_PRICE_API_MONTHLY_LIMIT,
            Duration::hours(COMMODITIES_MIN_INTERVAL_HOURS),
        )
    }

    /// Change the contractual limit and recompute both thresholds from it.
    pub fn with_monthly_limit(mut self, monthly_limit: u64) -> Self {
        self.monthly_limit = monthly_limit;
        self.hard_stop_threshold = percent_of(monthly_limit, HARD_STOP_PERCENT);
        self.warning_threshold = percent_of(monthly_limit, WARNING_PERCENT);
        self
    }

    pub fn with_thresholds(mut self, hard_stop: u64, warning: u64) -> Self {
        self.hard_stop_threshold = hard_stop;
        self.warning_threshold = warning;
        self
    }

    pub fn with_minimum_interval(mut self, interval: Duration) -> Self {
        self.minimum_interval = interval;
        self
    }

    pub fn with_metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = ttl;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, initial_delay: StdDuration) -> Self {
        self.retry = RetryPolicy {
            max_retries,
            initial_delay,
        };
        self
    }

    pub fn with_write_delay(mut self, delay: StdDuration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn with_ledger_failure_policy(mut self, policy: LedgerFailurePolicy) -> Self {
        self.ledger_failure_policy = policy;
        self
    }

    /// Tracked symbols trimmed, upper-cased and de-duplicated, in configured order.
    pub fn tracked_symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider_id.trim().is_empty() {
            return invalid("provider id must not be empty".to_string());
        }
        if self.hard_stop_threshold >= self.monthly_limit {
            return invalid(format!(
                "{}: hard stop {} must be below the monthly limit {}",
                self.provider_id, self.hard_stop_threshold, self.monthly_limit
            ));
        }
        if self.warning_threshold > self.hard_stop_threshold {
            return invalid(format!(
                "{}: warning threshold {} must not exceed hard stop {}",
                self.provider_id, self.warning_threshold, self.hard_stop_threshold
            ));
        }
        if self.retry.max_retries == 0 {
            return invalid(format!("{}: max_retries must be at least 1", self.provider_id));
        }
        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(ValidationError::InvalidConfig(message).into())
}

fn percent_of(value: u64, percent: u64) -> u64 {
    value.saturating_mul(percent) / 100
}
