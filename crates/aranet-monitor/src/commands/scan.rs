//! Scan command implementation.

use anyhow::{Context, Result};
use aranet_core::{ScanOptions, scan};

use crate::cli::OutputFormat;
use crate::format::{format_scan_json, format_scan_text};
use crate::style;

pub async fn cmd_scan(
    timeout: u64,
    format: OutputFormat,
    all: bool,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    // Show spinner for text output (unless quiet)
    let spinner = if !quiet && matches!(format, OutputFormat::Text) {
        Some(style::scanning_spinner(timeout))
    } else {
        None
    };

    let mut options = ScanOptions::default().duration_secs(timeout);
    if all {
        options = options.all_devices();
    }

    let devices = scan::discover(options)
        .await
        .context("Failed to scan for devices")?;

    // Clear spinner before output
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let content = match format {
        OutputFormat::Json => format_scan_json(&devices)?,
        OutputFormat::Text => format_scan_text(&devices, no_color),
    };
    print!("{}", content);

    Ok(())
}
