//! CSV import and export commands.

use std::path::Path;

use anyhow::{Context, Result};
use aranet_store::Store;

use crate::cli::CsvArgs;
use crate::config::{Config, resolve_csv_format};

pub fn cmd_import(
    file: &Path,
    csv: &CsvArgs,
    database: &Path,
    quiet: bool,
    config: &Config,
) -> Result<()> {
    let format = resolve_csv_format(csv.date_format.as_deref(), config)?;
    let mut store = Store::open(database)
        .with_context(|| format!("Failed to open database: {}", database.display()))?;

    let result = store
        .import_csv(file, &format)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if !quiet {
        println!(
            "Read {} records: {} new, {} already recorded",
            result.read, result.imported, result.skipped
        );
    }
    Ok(())
}

pub fn cmd_export(
    file: &Path,
    csv: &CsvArgs,
    database: &Path,
    quiet: bool,
    config: &Config,
) -> Result<()> {
    let format = resolve_csv_format(csv.date_format.as_deref(), config)?;
    let store = Store::open(database)
        .with_context(|| format!("Failed to open database: {}", database.display()))?;

    let written = store
        .export_csv(file, &format)
        .with_context(|| format!("Failed to export to {}", file.display()))?;

    if !quiet {
        println!("Exported {} records to {}", written, file.display());
    }
    Ok(())
}
