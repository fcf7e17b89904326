//! Local reading history for Aranet sensors.
//!
//! This crate keeps the append-only record of accepted readings and answers
//! the questions the live monitor asks of it.
//!
//! # Features
//!
//! - Timestamp-keyed history; duplicate timestamps are rejected, never overwritten
//! - Min/max/mean over the full history
//! - Rank and percentile of a value against everything stored
//! - CSV import/export in the Aranet record file layout
//! - Time-range queries with pagination
//!
//! # Example
//!
//! ```no_run
//! use aranet_store::{HistoryQuery, HistoryStore, Store};
//! use aranet_types::Field;
//!
//! let store = Store::open_default()?;
//!
//! let stats = store.aggregate()?;
//! println!("{} records, peak CO2 {:?}", stats.count, stats.co2.max);
//!
//! if stats.count > 0 {
//!     println!("800 ppm ranks #{}", store.rank(Field::Co2, 800.0)?);
//! }
//!
//! let recent = store.query(&HistoryQuery::new().limit(10))?;
//! # Ok::<(), aranet_store::Error>(())
//! ```

mod error;
mod exchange;
mod history;
mod memory;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use exchange::{CSV_HEADER, CsvFormat, DEFAULT_DATE_FORMAT, read_csv, write_csv};
pub use history::{HistoryStore, SAME_MEASUREMENT_SECS, import_readings};
pub use memory::MemoryStore;
pub use models::{FieldStats, HistoryStats, ImportResult};
pub use queries::HistoryQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/aranet-monitor/history.db`
/// - macOS: `~/Library/Application Support/aranet-monitor/history.db`
/// - Windows: `C:\Users\<user>\AppData\Local\aranet-monitor\history.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("aranet-monitor")
        .join("history.db")
}
