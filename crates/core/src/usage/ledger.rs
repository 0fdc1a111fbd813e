//! Usage ledger.
//!
//! Wraps a [`UsageStore`] with the failure semantics the sync engine needs:
//! recording never fails the caller, and counting has a lenient form that
//! reports zero when the store is unavailable.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;

use super::model::NewUsageRecord;
use super::store::UsageStore;
use crate::errors::Result;

pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Append a record for one call attempt. Store failures are logged and
    /// swallowed.
    pub async fn record(
        &self,
        provider: &str,
        endpoint: &str,
        success: bool,
        status_code: Option<u16>,
    ) {
        let record = NewUsageRecord {
            provider: provider.to_string(),
            endpoint: endpoint.to_string(),
            success,
            status_code,
            timestamp: Utc::now(),
        };

        match self.store.record_usage(record).await {
            Ok(_) => debug!(
                "Recorded {} call to {} (success={}, status={:?})",
                provider, endpoint, success, status_code
            ),
            Err(e) => warn!(
                "Failed to record usage for {} {}: {}",
                provider, endpoint, e
            ),
        }
    }

    /// Number of records for `provider` since `since`, or 0 when the store
    /// cannot answer.
    pub fn count_since(&self, provider: &str, since: DateTime<Utc>, only_successful: bool) -> u64 {
        match self.try_count_since(provider, since, only_successful) {
            Ok(count) => count,
            Err(e) => {
                warn!("Usage ledger unavailable for {}, counting 0: {}", provider, e);
                0
            }
        }
    }

    /// Like [`count_since`](Self::count_since) but surfaces store failures.
    pub fn try_count_since(
        &self,
        provider: &str,
        since: DateTime<Utc>,
        only_successful: bool,
    ) -> Result<u64> {
        self.store
            .count_usage_since(provider, since, only_successful)
    }
}
