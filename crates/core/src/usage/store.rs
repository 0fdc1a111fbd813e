use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewUsageRecord, UsageRecord};
use crate::errors::Result;

/// Storage interface for the append-only usage log.
///
/// Records are never updated or deleted through this trait.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Append one record.
    async fn record_usage(&self, record: NewUsageRecord) -> Result<UsageRecord>;

    /// Count records for `provider` with `timestamp >= since`.
    fn count_usage_since(
        &self,
        provider: &str,
        since: DateTime<Utc>,
        only_successful: bool,
    ) -> Result<u64>;
}
