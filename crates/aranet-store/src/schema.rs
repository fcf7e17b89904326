//! Database schema.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Error, Result};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Version 1: one row per accepted reading.
///
/// `timestamp` is the primary key: it aliases the rowid, so the table is
/// kept in timestamp order and a second insert for the same second fails.
const SCHEMA_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_version (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        version INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS history (
        timestamp INTEGER PRIMARY KEY,
        co2 INTEGER NOT NULL,
        temperature REAL NOT NULL,
        humidity REAL NOT NULL,
        pressure REAL NOT NULL
    );

    INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, 1);
"#;

/// Create the schema on a fresh database and check the version of an
/// existing one.
pub fn initialize(conn: &Connection) -> Result<()> {
    match stored_version(conn)? {
        None => {
            debug!("Creating history schema v{}", SCHEMA_VERSION);
            conn.execute_batch(SCHEMA_V1)?;
            Ok(())
        }
        Some(found) if found > SCHEMA_VERSION => Err(Error::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        }),
        Some(_) => Ok(()),
    }
}

/// Version recorded in the database, `None` before the schema exists.
fn stored_version(conn: &Connection) -> Result<Option<i32>> {
    let has_table: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(None);
    }

    Ok(conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?)
}
