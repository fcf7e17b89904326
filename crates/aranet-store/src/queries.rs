//! Query builder for stored history.
//!
//! # Example
//!
//! ```
//! use aranet_store::{Store, HistoryQuery};
//! use time::{OffsetDateTime, Duration};
//!
//! let store = Store::open_in_memory()?;
//! let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
//!
//! // Last day of records, newest first
//! let query = HistoryQuery::new().since(yesterday).limit(50);
//! let records = store.query(&query)?;
//!
//! // Everything, oldest first, for export
//! let all = store.query(&HistoryQuery::new().oldest_first())?;
//! # Ok::<(), aranet_store::Error>(())
//! ```

use time::OffsetDateTime;

/// Fluent query builder for history records.
///
/// By default, queries return results ordered by timestamp descending
/// (newest first).
#[derive(Debug, Default, Clone)]
pub struct HistoryQuery {
    /// Filter records at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Filter records at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by timestamp descending (newest first).
    pub newest_first: bool,
}

impl HistoryQuery {
    /// Create a new query: all records, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter to records at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to records at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<i64>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(since) = self.since {
            conditions.push("timestamp >= ?");
            params.push(since.unix_timestamp());
        }

        if let Some(until) = self.until {
            conditions.push("timestamp <= ?");
            params.push(until.unix_timestamp());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT timestamp, co2, temperature, humidity, pressure \
             FROM history {} ORDER BY timestamp {}",
            where_clause, order
        );

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let query = HistoryQuery::new();
        assert!(query.newest_first);
        assert!(query.since.is_none());
        assert!(query.limit.is_none());

        let sql = query.build_sql();
        assert!(sql.contains("ORDER BY timestamp DESC"));
        assert!(!sql.contains("WHERE"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_time_range() {
        let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let end = OffsetDateTime::from_unix_timestamp(1_700_003_600).unwrap();
        let query = HistoryQuery::new().since(start).until(end);

        let (where_clause, params) = query.build_where();
        assert_eq!(where_clause, "WHERE timestamp >= ? AND timestamp <= ?");
        assert_eq!(params, vec![1_700_000_000, 1_700_003_600]);
    }

    #[test]
    fn test_pagination_and_order() {
        let sql = HistoryQuery::new().limit(10).offset(20).oldest_first().build_sql();
        assert!(sql.contains("ORDER BY timestamp ASC"));
        assert!(sql.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_offset_without_limit() {
        let sql = HistoryQuery::new().offset(5).build_sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET 5"));
    }
}
