//! Utility functions for CLI operations.

use anyhow::{Context, Result, bail};
use aranet_core::{ScanOptions, scan};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::{Config, resolve_device};
use crate::style;

/// Get the device identifier from args or config, scanning for the only
/// device in range when neither names one.
pub async fn require_device(
    device: Option<String>,
    scan_timeout: u64,
    quiet: bool,
    config: &Config,
) -> Result<String> {
    if let Some(device) = resolve_device(device, config) {
        return Ok(device);
    }

    let spinner = (!quiet).then(|| style::scanning_spinner(scan_timeout));
    let found = scan::find_single_device(ScanOptions::default().duration_secs(scan_timeout)).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let device = found.context(
        "No device specified. Use --device <ADDRESS>, set ARANET_MAC, or set `device` in the config file",
    )?;
    if !quiet {
        eprintln!(
            "Found {} ({})",
            device.name.as_deref().unwrap_or("Unknown"),
            device.identifier
        );
    }
    Ok(device.identifier)
}

/// Parse a date/time string in RFC3339 or YYYY-MM-DD format.
///
/// A bare date is the start of that day in UTC, or its last second when
/// `end_of_day` is set.
pub fn parse_datetime(s: &str, end_of_day: bool) -> Result<OffsetDateTime> {
    // Try RFC3339 first (e.g., "2024-01-15T10:30:00Z")
    if let Ok(dt) = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339) {
        return Ok(dt);
    }

    if let Ok(date) = time::Date::parse(s, format_description!("[year]-[month]-[day]")) {
        let start = date.midnight().assume_utc();
        return Ok(if end_of_day {
            start + time::Duration::days(1) - time::Duration::seconds(1)
        } else {
            start
        });
    }

    bail!(
        "Invalid date format '{}'. Use RFC3339 (e.g., 2024-01-15T10:30:00Z) or YYYY-MM-DD",
        s
    )
}
