//! In-memory history store.

use std::collections::BTreeMap;
use std::collections::HashSet;

use aranet_types::{Field, Reading};

use crate::error::{Error, Result};
use crate::history::{HistoryStore, percentile_from_counts};
use crate::models::{FieldStats, HistoryStats};

/// A [`HistoryStore`] held in a `BTreeMap` keyed by unix timestamp.
///
/// Nothing is written to disk. Used for dry runs and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<i64, Reading>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over stored records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.records.values()
    }

    fn values(&self, field: Field) -> impl Iterator<Item = f64> + '_ {
        self.records.values().map(move |r| r.value(field))
    }
}

/// Collects readings the way [`HistoryStore::append`] would: the first
/// reading at a timestamp is kept and later ones are ignored.
impl FromIterator<Reading> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        let mut records = BTreeMap::new();
        for reading in iter {
            records
                .entry(reading.timestamp().unix_timestamp())
                .or_insert(reading);
        }
        Self { records }
    }
}

impl HistoryStore for MemoryStore {
    fn append(&mut self, reading: &Reading) -> Result<()> {
        let key = reading.timestamp().unix_timestamp();
        if self.records.contains_key(&key) {
            return Err(Error::DuplicateKey {
                timestamp: reading.timestamp(),
            });
        }
        self.records.insert(key, *reading);
        Ok(())
    }

    fn latest(&self) -> Result<Option<Reading>> {
        Ok(self.records.values().next_back().copied())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }

    fn aggregate(&self) -> Result<HistoryStats> {
        let count = self.records.len() as u64;
        let mut stats = HistoryStats {
            count,
            ..Default::default()
        };
        if count == 0 {
            return Ok(stats);
        }

        for field in Field::ALL {
            let (min, max, sum) = self.values(field).fold(
                (f64::INFINITY, f64::NEG_INFINITY, 0.0),
                |(min, max, sum), v| (min.min(v), max.max(v), sum + v),
            );
            *stats.field_mut(field) = FieldStats {
                min: Some(min),
                max: Some(max),
                mean: Some(sum / count as f64),
            };
        }

        Ok(stats)
    }

    fn rank(&self, field: Field, value: f64) -> Result<u64> {
        let greater: HashSet<u64> = self
            .values(field)
            .filter(|v| *v > value)
            .map(f64::to_bits)
            .collect();
        Ok(greater.len() as u64 + 1)
    }

    fn percentile(&self, field: Field, value: f64) -> Result<u8> {
        let below = self.values(field).filter(|v| *v < value).count() as u64;
        percentile_from_counts(below, self.records.len() as u64)
    }
}
