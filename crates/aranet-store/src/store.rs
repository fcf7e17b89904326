//! SQLite-backed history store.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info};

use aranet_types::{Field, Reading};

use crate::error::{Error, Result};
use crate::history::{HistoryStore, percentile_from_counts};
use crate::models::{FieldStats, HistoryStats};
use crate::queries::HistoryQuery;
use crate::schema;

const SELECT_COLUMNS: &str = "SELECT timestamp, co2, temperature, humidity, pressure FROM history";

/// SQLite-based store for accepted readings.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // FULL sync: an accepted reading must survive a crash right after append
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Query records with filters.
    pub fn query(&self, query: &HistoryQuery) -> Result<Vec<Reading>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params_from_iter(params), row_to_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count_where(&self, field: Field, op: &str, value: f64, distinct: bool) -> Result<u64> {
        let column = field.column();
        let counted = if distinct {
            format!("DISTINCT {column}")
        } else {
            "*".to_string()
        };
        let sql = format!("SELECT COUNT({counted}) FROM history WHERE {column} {op} ?1");
        let count: i64 = self.conn.query_row(&sql, [value], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl HistoryStore for Store {
    fn append(&mut self, reading: &Reading) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO history (timestamp, co2, temperature, humidity, pressure)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                reading.timestamp().unix_timestamp(),
                reading.co2(),
                reading.temperature(),
                reading.humidity(),
                reading.pressure(),
            ],
        );

        match result {
            Ok(_) => {
                debug!("Appended record at {}", reading.timestamp());
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateKey {
                    timestamp: reading.timestamp(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn latest(&self) -> Result<Option<Reading>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY timestamp DESC LIMIT 1");
        let latest = self
            .conn
            .query_row(&sql, [], row_to_reading)
            .optional()?;
        Ok(latest)
    }

    fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn aggregate(&self) -> Result<HistoryStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*),
                MIN(co2), MAX(co2), AVG(co2),
                MIN(temperature), MAX(temperature), AVG(temperature),
                MIN(humidity), MAX(humidity), AVG(humidity),
                MIN(pressure), MAX(pressure), AVG(pressure)
             FROM history",
            [],
            |row| {
                let mut stats = HistoryStats {
                    count: row.get::<_, i64>(0)? as u64,
                    ..Default::default()
                };
                for (i, field) in Field::ALL.into_iter().enumerate() {
                    let base = 1 + i * 3;
                    *stats.field_mut(field) = FieldStats {
                        min: row.get(base)?,
                        max: row.get(base + 1)?,
                        mean: row.get(base + 2)?,
                    };
                }
                Ok(stats)
            },
        )?;

        Ok(stats)
    }

    fn rank(&self, field: Field, value: f64) -> Result<u64> {
        Ok(self.count_where(field, ">", value, true)? + 1)
    }

    fn percentile(&self, field: Field, value: f64) -> Result<u8> {
        let below = self.count_where(field, "<", value, false)?;
        percentile_from_counts(below, self.count()?)
    }
}

/// Rebuild a reading from a history row.
///
/// Stored temperatures are already in °F.
fn row_to_reading(row: &Row<'_>) -> rusqlite::Result<Reading> {
    let ts: i64 = row.get(0)?;
    let timestamp = OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;

    Ok(Reading::builder(timestamp)
        .co2(row.get(1)?)
        .fahrenheit(row.get(2)?)
        .humidity(row.get(3)?)
        .pressure(row.get(4)?)
        .build())
}


/// Property-based tests for history ordering.
#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Whatever order appends arrive in, and however many collide on a
        /// timestamp, stored history stays strictly increasing.
        #[test]
        fn stored_timestamps_strictly_increase(
            offsets in proptest::collection::vec(0i64..600, 1..40),
        ) {
            let mut store = Store::open_in_memory().unwrap();
            let base = 1_714_550_400;
            for (i, offset) in offsets.iter().enumerate() {
                let ts = OffsetDateTime::from_unix_timestamp(base + offset).unwrap();
                let reading = Reading::builder(ts)
                    .co2(400 + i as u16)
                    .celsius(20.0)
                    .humidity(40.0)
                    .pressure(1000.0)
                    .build();
                match store.append(&reading) {
                    Ok(()) => {}
                    Err(e) => prop_assert!(e.is_duplicate()),
                }
            }

            let stored = store.query(&HistoryQuery::new().oldest_first()).unwrap();
            let mut distinct = offsets.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(stored.len(), distinct.len());
            prop_assert!(stored.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));
        }
    }
}
