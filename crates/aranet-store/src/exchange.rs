//! CSV import and export.
//!
//! The file layout is the one written by Aranet record-keeping scripts: a
//! header line, then one fully quoted row per measurement with temperature
//! in °C. Temperatures are converted to °F on import and back on export.
//!
//! ```text
//! Time(MM/DD/YYYY hh:mm:ss),Carbon dioxide(ppm),Temperature(°C),Relative humidity(%),Atmospheric pressure(hPa)
//! "05/01/2024 08:00:00","812","21.3","42","1011.5"
//! ```

use std::fs::File;
use std::io;
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use time::PrimitiveDateTime;
use time::format_description::{self, OwnedFormatItem};
use time::macros::format_description;
use tracing::info;

use aranet_types::Reading;

use crate::error::{Error, Result};
use crate::history::import_readings;
use crate::models::ImportResult;
use crate::queries::HistoryQuery;
use crate::store::Store;

/// Column headers of the exchange format.
pub const CSV_HEADER: [&str; 5] = [
    "Time(MM/DD/YYYY hh:mm:ss)",
    "Carbon dioxide(ppm)",
    "Temperature(°C)",
    "Relative humidity(%)",
    "Atmospheric pressure(hPa)",
];

/// Default timestamp layout, in `time` format description syntax.
pub const DEFAULT_DATE_FORMAT: &str = "[month]/[day]/[year] [hour]:[minute]:[second]";

/// How timestamps are written in the first column.
///
/// Timestamps are always interpreted as UTC.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    date_format: OwnedFormatItem,
}

impl CsvFormat {
    /// Build a format from a `time` format description such as
    /// `[year]-[month]-[day] [hour]:[minute]:[second]`.
    pub fn new(date_format: &str) -> Result<Self> {
        let date_format =
            format_description::parse_owned::<2>(date_format).map_err(|e| {
                Error::InvalidDateFormat {
                    format: date_format.to_string(),
                    message: e.to_string(),
                }
            })?;
        Ok(Self { date_format })
    }

    fn format_timestamp(&self, reading: &Reading) -> Result<String> {
        reading
            .timestamp()
            .format(&self.date_format)
            .map_err(|e| Error::InvalidTimestamp(e.to_string()))
    }

    fn parse_timestamp(&self, value: &str, line: u64) -> Result<time::OffsetDateTime> {
        PrimitiveDateTime::parse(value, &self.date_format)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|e| Error::InvalidRow {
                line,
                message: format!("bad timestamp '{value}': {e}"),
            })
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            date_format: format_description!("[month]/[day]/[year] [hour]:[minute]:[second]")
                .into(),
        }
    }
}

/// Read every row of an exchange file.
///
/// Rows are returned in file order; the header line is skipped.
pub fn read_csv<R: io::Read>(reader: R, format: &CsvFormat) -> Result<Vec<Reading>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut readings = Vec::new();
    for record in reader.records() {
        let record = record?;
        readings.push(parse_row(&record, format)?);
    }

    Ok(readings)
}

fn parse_row(record: &StringRecord, format: &CsvFormat) -> Result<Reading> {
    let line = record.position().map_or(0, |p| p.line());
    let invalid = |message: String| Error::InvalidRow { line, message };

    if record.len() < CSV_HEADER.len() {
        return Err(invalid(format!(
            "expected {} columns, found {}",
            CSV_HEADER.len(),
            record.len()
        )));
    }

    let number = |idx: usize| -> Result<f32> {
        let raw = record[idx].trim();
        raw.parse::<f32>()
            .map_err(|_| invalid(format!("'{}' is not a number in column {}", raw, idx + 1)))
    };

    let timestamp = format.parse_timestamp(record[0].trim(), line)?;
    let co2 = record[1]
        .trim()
        .parse::<u16>()
        .map_err(|_| invalid(format!("'{}' is not a CO2 value", record[1].trim())))?;

    Reading::builder(timestamp)
        .co2(co2)
        .celsius(number(2)?)
        .humidity(number(3)?)
        .pressure(number(4)?)
        .try_build()
        .map_err(|e| invalid(e.to_string()))
}

/// Write readings as an exchange file, header first.
///
/// Returns the number of rows written.
pub fn write_csv<'a, W, I>(writer: W, readings: I, format: &CsvFormat) -> Result<usize>
where
    W: io::Write,
    I: IntoIterator<Item = &'a Reading>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    writer.write_record(CSV_HEADER)?;

    let mut written = 0;
    for reading in readings {
        writer.write_record([
            format.format_timestamp(reading)?,
            reading.co2().to_string(),
            round_hundredths(reading.temperature_celsius()).to_string(),
            reading.humidity().to_string(),
            reading.pressure().to_string(),
        ])?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

// The device reports 0.05 °C steps; this drops float noise from the °F round trip.
fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

impl Store {
    /// Import an exchange file into the store.
    ///
    /// Only rows more than a minute newer than the latest stored record are
    /// appended.
    pub fn import_csv<P: AsRef<Path>>(&mut self, path: P, format: &CsvFormat) -> Result<ImportResult> {
        let path = path.as_ref();
        info!("Importing records from {}", path.display());

        let readings = read_csv(File::open(path)?, format)?;
        import_readings(self, readings)
    }

    /// Export every stored record, oldest first.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P, format: &CsvFormat) -> Result<usize> {
        let path = path.as_ref();
        let records = self.query(&HistoryQuery::new().oldest_first())?;

        let written = write_csv(File::create(path)?, &records, format)?;
        info!("Exported {} records to {}", written, path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::history::HistoryStore;

    const SAMPLE: &str = "\
Time(MM/DD/YYYY hh:mm:ss),Carbon dioxide(ppm),Temperature(°C),Relative humidity(%),Atmospheric pressure(hPa)
\"05/01/2024 08:00:00\",\"812\",\"20\",\"42\",\"1011.5\"
\"05/01/2024 08:05:00\",\"845\",\"21.5\",\"43\",\"1011.4\"
";

    #[test]
    fn test_read_csv_converts_to_fahrenheit() {
        let readings = read_csv(SAMPLE.as_bytes(), &CsvFormat::default()).unwrap();
        assert_eq!(readings.len(), 2);

        let first = &readings[0];
        assert_eq!(first.timestamp(), datetime!(2024-05-01 08:00:00 UTC));
        assert_eq!(first.co2(), 812);
        assert!((first.temperature() - 68.0).abs() < 1e-4);
        assert!((first.humidity() - 42.0).abs() < f32::EPSILON);
        assert!((readings[1].temperature() - 70.7).abs() < 1e-4);
    }

    #[test]
    fn test_read_csv_reports_bad_row() {
        let data = format!("{}\"05/01/2024 08:10:00\",\"lots\",\"20\",\"42\",\"1011\"\n", SAMPLE);
        let err = read_csv(data.as_bytes(), &CsvFormat::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRow { line: 4, .. }));
    }

    #[test]
    fn test_read_csv_rejects_out_of_range_humidity() {
        let data = format!("{}\"05/01/2024 08:10:00\",\"900\",\"20\",\"142\",\"1011\"\n", SAMPLE);
        assert!(matches!(
            read_csv(data.as_bytes(), &CsvFormat::default()),
            Err(Error::InvalidRow { .. })
        ));
    }

    #[test]
    fn test_write_csv_layout() {
        let readings = read_csv(SAMPLE.as_bytes(), &CsvFormat::default()).unwrap();
        let mut out = Vec::new();
        let written = write_csv(&mut out, &readings, &CsvFormat::default()).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().contains("\"Temperature(°C)\""));
        assert_eq!(
            lines.next().unwrap(),
            "\"05/01/2024 08:00:00\",\"812\",\"20\",\"42\",\"1011.5\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"05/01/2024 08:05:00\",\"845\",\"21.5\",\"43\",\"1011.4\""
        );
    }

    #[test]
    fn test_custom_date_format() {
        let format = CsvFormat::new("[year]-[month]-[day]T[hour]:[minute]:[second]").unwrap();
        let data = "header,a,b,c,d\n\"2024-05-01T08:00:00\",\"700\",\"19\",\"40\",\"1009\"\n";
        let readings = read_csv(data.as_bytes(), &format).unwrap();
        assert_eq!(readings[0].timestamp(), datetime!(2024-05-01 08:00:00 UTC));
    }

    #[test]
    fn test_invalid_date_format() {
        assert!(matches!(
            CsvFormat::new("[month/[day]"),
            Err(Error::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn test_import_applies_one_minute_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut store = Store::open_in_memory().unwrap();
        // Same measurement as the first row, stamped 30 s later
        store
            .append(
                &Reading::builder(datetime!(2024-05-01 08:00:30 UTC))
                    .co2(812)
                    .celsius(20.0)
                    .humidity(42.0)
                    .pressure(1011.5)
                    .build(),
            )
            .unwrap();

        let result = store.import_csv(&path, &CsvFormat::default()).unwrap();
        assert_eq!(
            result,
            ImportResult {
                read: 2,
                imported: 1,
                skipped: 1
            }
        );
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.latest().unwrap().unwrap().co2(), 845);

        // A second import of the same file adds nothing
        let again = store.import_csv(&path, &CsvFormat::default()).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped, 2);
    }

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.csv");
        let exported = dir.path().join("out.csv");
        std::fs::write(&source, SAMPLE).unwrap();

        let mut store = Store::open_in_memory().unwrap();
        store.import_csv(&source, &CsvFormat::default()).unwrap();
        assert_eq!(store.export_csv(&exported, &CsvFormat::default()).unwrap(), 2);

        let mut copy = Store::open_in_memory().unwrap();
        let result = copy.import_csv(&exported, &CsvFormat::default()).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(copy.aggregate().unwrap(), store.aggregate().unwrap());
    }
}
