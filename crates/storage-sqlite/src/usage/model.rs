use diesel::prelude::*;

use crate::utils::{format_timestamp, parse_timestamp};
use marketcache_core::errors::{Error, ValidationError};
use marketcache_core::usage::{NewUsageRecord, UsageRecord};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::api_usage)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UsageRecordDB {
    pub id: String,
    pub provider: String,
    pub endpoint: String,
    pub success: bool,
    pub status_code: Option<i32>,
    pub timestamp: String,
}

impl UsageRecordDB {
    pub fn new(id: String, record: &NewUsageRecord) -> Self {
        Self {
            id,
            provider: record.provider.clone(),
            endpoint: record.endpoint.clone(),
            success: record.success,
            status_code: record.status_code.map(i32::from),
            timestamp: format_timestamp(&record.timestamp),
        }
    }
}

impl TryFrom<UsageRecordDB> for UsageRecord {
    type Error = Error;

    fn try_from(row: UsageRecordDB) -> Result<Self, Self::Error> {
        let status_code = row
            .status_code
            .map(|code| {
                u16::try_from(code).map_err(|_| {
                    Error::Validation(ValidationError::InvalidInput(format!(
                        "Stored status code {} is out of range",
                        code
                    )))
                })
            })
            .transpose()?;

        Ok(UsageRecord {
            timestamp: parse_timestamp(&row.timestamp)?,
            id: row.id,
            provider: row.provider,
            endpoint: row.endpoint,
            success: row.success,
            status_code,
        })
    }
}
