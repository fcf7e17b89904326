//! Aggregate results computed over stored history.

use serde::{Deserialize, Serialize};

use aranet_types::Field;

/// Min/max/mean of one field over the stored set.
///
/// All values are `None` when the store is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Smallest stored value.
    pub min: Option<f64>,
    /// Largest stored value.
    pub max: Option<f64>,
    /// Arithmetic mean of stored values.
    pub mean: Option<f64>,
}

/// Aggregate statistics over the full stored history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Number of stored records.
    pub count: u64,
    /// CO2 statistics (ppm).
    pub co2: FieldStats,
    /// Temperature statistics (°F).
    pub temperature: FieldStats,
    /// Humidity statistics (%).
    pub humidity: FieldStats,
    /// Pressure statistics (hPa).
    pub pressure: FieldStats,
}

impl HistoryStats {
    /// Statistics for a single field.
    pub fn field(&self, field: Field) -> &FieldStats {
        match field {
            Field::Co2 => &self.co2,
            Field::Temperature => &self.temperature,
            Field::Humidity => &self.humidity,
            Field::Pressure => &self.pressure,
        }
    }

    pub(crate) fn field_mut(&mut self, field: Field) -> &mut FieldStats {
        match field {
            Field::Co2 => &mut self.co2,
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Pressure => &mut self.pressure,
        }
    }
}

/// Outcome of importing a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Rows read from the source.
    pub read: usize,
    /// Rows appended to the store.
    pub imported: usize,
    /// Rows skipped as already covered by stored history.
    pub skipped: usize,
}
