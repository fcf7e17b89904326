//! The history store abstraction.
//!
//! [`HistoryStore`] is the contract the monitoring core relies on: an
//! append-only, timestamp-keyed record of accepted readings that can answer
//! aggregate and rank queries. [`Store`](crate::Store) implements it on
//! SQLite and [`MemoryStore`](crate::MemoryStore) on a `BTreeMap`.

use aranet_types::{Field, Reading};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{HistoryStats, ImportResult};

/// Append-only, timestamp-ordered storage of accepted readings.
pub trait HistoryStore {
    /// Durably append a reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if a record with the same timestamp
    /// exists. Existing records are never overwritten.
    fn append(&mut self, reading: &Reading) -> Result<()>;

    /// The record with the greatest timestamp, if any.
    fn latest(&self) -> Result<Option<Reading>>;

    /// Number of stored records.
    fn count(&self) -> Result<u64>;

    /// Min/max/mean per field over every stored record.
    fn aggregate(&self) -> Result<HistoryStats>;

    /// 1-based rank of `value` among stored values of `field`, highest first.
    ///
    /// Defined as the number of *distinct* stored values strictly greater
    /// than `value`, plus one. Ties share a rank.
    fn rank(&self, field: Field, value: f64) -> Result<u64>;

    /// Position of `value` within the stored distribution of `field`, 0-100.
    ///
    /// Defined as `round((count of stored values < value + 1) / total * 100)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] when nothing is stored.
    fn percentile(&self, field: Field, value: f64) -> Result<u8>;
}

/// Turn the two counts behind a percentile query into a 0-100 value.
pub(crate) fn percentile_from_counts(below: u64, total: u64) -> Result<u8> {
    if total == 0 {
        return Err(Error::EmptyHistory);
    }
    let pct = ((below + 1) as f64 / total as f64 * 100.0).round();
    Ok(pct.clamp(0.0, 100.0) as u8)
}

/// Gap in seconds below which two records are taken to be the same
/// device measurement reported with a drifting timestamp.
pub const SAME_MEASUREMENT_SECS: i64 = 60;

/// Append a batch of readings that were recorded elsewhere (a CSV file or a
/// device download).
///
/// Only readings more than [`SAME_MEASUREMENT_SECS`] newer than the latest
/// stored record are taken; anything at or before that point is already
/// covered by history. Rejected duplicates are counted as skipped.
pub fn import_readings<S: HistoryStore + ?Sized>(
    store: &mut S,
    mut readings: Vec<Reading>,
) -> Result<ImportResult> {
    readings.sort_by_key(Reading::timestamp);

    let latest = store.latest()?.map(|r| r.timestamp().unix_timestamp());
    let mut result = ImportResult {
        read: readings.len(),
        ..Default::default()
    };

    for reading in &readings {
        let ts = reading.timestamp().unix_timestamp();
        let is_new = latest.is_none_or(|latest| ts - latest > SAME_MEASUREMENT_SECS);
        if !is_new {
            result.skipped += 1;
            continue;
        }

        match store.append(reading) {
            Ok(()) => result.imported += 1,
            Err(e) if e.is_duplicate() => result.skipped += 1,
            Err(e) => return Err(e),
        }
    }

    info!(
        "Imported {} of {} records ({} skipped)",
        result.imported,
        result.read,
        result.skipped
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_from_counts() {
        // (1 + 1) / 3 = 66.67 -> 67
        assert_eq!(percentile_from_counts(1, 3).unwrap(), 67);
        assert_eq!(percentile_from_counts(0, 4).unwrap(), 25);
        assert_eq!(percentile_from_counts(0, 1).unwrap(), 100);
    }

    #[test]
    fn test_percentile_clamped_for_values_above_history() {
        // Every stored value is below: (3 + 1) / 3 would exceed 100
        assert_eq!(percentile_from_counts(3, 3).unwrap(), 100);
    }

    #[test]
    fn test_percentile_empty() {
        assert!(matches!(
            percentile_from_counts(0, 0),
            Err(Error::EmptyHistory)
        ));
    }
}
