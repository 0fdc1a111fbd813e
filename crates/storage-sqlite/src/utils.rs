//! Helpers shared by the repositories.

use chrono::{DateTime, SecondsFormat, Utc};

use marketcache_core::Result;

/// Upper bound on bound parameters per `IN (...)` query.
///
/// SQLite's historical limit is 999; 500 leaves room for the other filters.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that
/// lexicographic order in SQL matches chronological order.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_chunking_splits_at_limit() {
        let items: Vec<u32> = (0..1001).collect();
        let sizes: Vec<usize> = chunk_for_sqlite(&items).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![500, 500, 1]);
    }

    #[test]
    fn test_timestamp_strings_sort_chronologically() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = base + Duration::milliseconds(1500);

        let a = format_timestamp(&base);
        let b = format_timestamp(&later);

        assert_eq!(a, "2024-03-01T09:00:00.000000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), later);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
