//! Budget gatekeeper.
//!
//! Checks run in order and the first failure wins:
//! 1. hard quota stop (usage ledger, current calendar month, UTC)
//! 2. minimum interval since the last successful refresh (quote store)
//! 3. soft warning threshold, which only flags the decision

use chrono::{DateTime, Datelike, TimeZone, Utc};
use log::{info, warn};
use std::sync::Arc;

use super::limits_model::RefreshDecision;
use crate::quotes::{LedgerFailurePolicy, ProviderConfig, QuoteStore};
use crate::usage::UsageLedger;

/// First instant of the calendar month containing `now`, in UTC.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// First instant of the calendar month after the one containing `now`.
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub struct BudgetGatekeeper {
    ledger: Arc<UsageLedger>,
    quote_store: Arc<dyn QuoteStore>,
}

impl BudgetGatekeeper {
    pub fn new(ledger: Arc<UsageLedger>, quote_store: Arc<dyn QuoteStore>) -> Self {
        Self {
            ledger,
            quote_store,
        }
    }

    /// Decide whether `config`'s provider may run a refresh cycle at `now`.
    pub fn can_refresh(&self, config: &ProviderConfig, now: DateTime<Utc>) -> RefreshDecision {
        let provider = config.provider_id.as_str();
        let mut ledger_warning = None;

        let used = match self
            .ledger
            .try_count_since(provider, month_start(now), true)
        {
            Ok(count) => count,
            Err(e) => match config.ledger_failure_policy {
                LedgerFailurePolicy::FailOpen => {
                    warn!(
                        "Usage ledger unavailable for {}, quota protection disabled this cycle: {}",
                        provider, e
                    );
                    ledger_warning = Some(format!("Usage ledger unavailable: {}", e));
                    0
                }
                LedgerFailurePolicy::FailClosed => {
                    let reason = format!("Usage ledger unavailable for {}: {}", provider, e);
                    info!("Refresh denied: {}", reason);
                    return RefreshDecision::deny(0, reason, None);
                }
            },
        };

        if used >= config.hard_stop_threshold {
            let reason = format!(
                "Monthly quota reached for {}: {}/{} calls used (limit {})",
                provider, used, config.hard_stop_threshold, config.monthly_limit
            );
            info!("Refresh denied: {}", reason);
            return RefreshDecision::deny(used, reason, Some(next_month_start(now)));
        }

        let last_refresh = match self.quote_store.last_refresh_timestamp(config.asset_class) {
            Ok(ts) => ts,
            Err(e) => {
                let reason = format!(
                    "Could not read last refresh time for {}: {}",
                    config.asset_class, e
                );
                info!("Refresh denied: {}", reason);
                return RefreshDecision::deny(used, reason, None);
            }
        };

        if let Some(last) = last_refresh {
            let next_eligible = last + config.minimum_interval;
            if now < next_eligible {
                let reason = format!(
                    "Minimum interval not elapsed for {}: last refresh at {}, next eligible at {}",
                    provider,
                    last.to_rfc3339(),
                    next_eligible.to_rfc3339()
                );
                info!("Refresh denied: {}", reason);
                return RefreshDecision::deny(used, reason, Some(next_eligible));
            }
        }

        let warning = if used >= config.warning_threshold {
            let message = format!(
                "{} usage at {}/{} calls this month (hard stop {})",
                provider, used, config.monthly_limit, config.hard_stop_threshold
            );
            warn!("{}", message);
            Some(message)
        } else {
            ledger_warning
        };

        RefreshDecision::allow(used).with_warning(warning)
    }
}
