//! Where a reading stands against stored history.

use serde::Serialize;

use aranet_store::HistoryStore;
use aranet_types::{Field, Reading};

use crate::error::Result;

/// Rank and percentile of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// 1 = highest value on record.
    pub rank: u64,
    /// 0-100 position within the stored distribution.
    pub percentile: u8,
}

/// Standing of every field of one reading.
///
/// Empty when history was empty at the time it was computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Standings {
    co2: Option<Standing>,
    temperature: Option<Standing>,
    humidity: Option<Standing>,
    pressure: Option<Standing>,
}

impl Standings {
    /// Standings with nothing to compare against.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compare each field of `reading` against `store`.
    ///
    /// Must be called before `reading` itself is appended. An empty store
    /// yields [`Standings::empty`].
    pub fn compute<S: HistoryStore + ?Sized>(store: &S, reading: &Reading) -> Result<Self> {
        let mut standings = Self::default();
        if store.count()? == 0 {
            return Ok(standings);
        }

        for field in Field::ALL {
            let value = reading.value(field);
            *standings.slot(field) = Some(Standing {
                rank: store.rank(field, value)?,
                percentile: store.percentile(field, value)?,
            });
        }

        Ok(standings)
    }

    /// Standing of one field, if history was available.
    pub fn get(&self, field: Field) -> Option<Standing> {
        match field {
            Field::Co2 => self.co2,
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Pressure => self.pressure,
        }
    }

    /// Rank of one field, if history was available.
    pub fn rank(&self, field: Field) -> Option<u64> {
        self.get(field).map(|s| s.rank)
    }

    /// Whether nothing was compared.
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }

    fn slot(&mut self, field: Field) -> &mut Option<Standing> {
        match field {
            Field::Co2 => &mut self.co2,
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Pressure => &mut self.pressure,
        }
    }
}
