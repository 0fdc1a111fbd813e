use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use super::model::UsageRecordDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::api_usage::dsl as usage_dsl;
use crate::utils::format_timestamp;
use marketcache_core::usage::{NewUsageRecord, UsageRecord, UsageStore};
use marketcache_core::Result;

pub struct UsageRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl UsageRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl UsageStore for UsageRepository {
    async fn record_usage(&self, record: NewUsageRecord) -> Result<UsageRecord> {
        let row = UsageRecordDB::new(Uuid::new_v4().to_string(), &record);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UsageRecord> {
                diesel::insert_into(usage_dsl::api_usage)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                UsageRecord::try_from(row)
            })
            .await
    }

    fn count_usage_since(
        &self,
        provider: &str,
        since: DateTime<Utc>,
        only_successful: bool,
    ) -> Result<u64> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = usage_dsl::api_usage
            .filter(usage_dsl::provider.eq(provider))
            .filter(usage_dsl::timestamp.ge(format_timestamp(&since)))
            .into_boxed();

        if only_successful {
            query = query.filter(usage_dsl::success.eq(true));
        }

        let count: i64 = query.count().get_result(&mut conn).into_core()?;
        Ok(count.max(0) as u64)
    }
}
