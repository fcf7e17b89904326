//! Visual styling utilities for the terminal.
//!
//! This module provides consistent styling across all output:
//! - Spinners for scans
//! - Status colors and change arrows
//! - Table formatting

use std::time::Duration;

use aranet_types::Status;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

// ============================================================================
// Progress Indicators
// ============================================================================

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

/// Get the standard spinner style.
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICK_CHARS)
}

/// Create a spinner for scanning operations.
pub fn scanning_spinner(timeout_secs: u64) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(format!(
        "Scanning for Aranet devices... ({}s)",
        timeout_secs
    ));
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for a history download.
pub fn download_spinner(identifier: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(format!("Downloading history from {}...", identifier));
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

// ============================================================================
// Status Colors
// ============================================================================

/// Color name for a status tier, as understood by HTML `<font>`.
///
/// `None` for [`Status::Error`], which is shown uncolored.
pub fn status_color(status: Status) -> Option<&'static str> {
    match status {
        Status::Green => Some("green"),
        Status::Yellow => Some("yellow"),
        Status::Red => Some("red"),
        _ => None,
    }
}

/// Paint text with the ANSI color of a status tier.
pub fn paint_status(text: &str, status: Option<Status>, no_color: bool) -> String {
    if no_color {
        return text.to_string();
    }
    match status {
        Some(Status::Green) => format!("{}", text.green()),
        Some(Status::Yellow) => format!("{}", text.yellow()),
        Some(Status::Red) => format!("{}", text.red()),
        _ => text.to_string(),
    }
}

// ============================================================================
// Change Indicators
// ============================================================================

/// Arrow for the direction of a change.
pub fn change_arrow(delta: f64) -> &'static str {
    if delta > 0.0 {
        "↑"
    } else if delta < 0.0 {
        "↓"
    } else {
        "⇵"
    }
}

/// Arrow followed by the signed change, one decimal.
pub fn format_change(delta: f64) -> String {
    format!("{} {:.1}", change_arrow(delta), delta)
}

// ============================================================================
// Numbers and Signal
// ============================================================================

/// Format an integer with thousands separators.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Format RSSI as a visual signal bar.
/// RSSI typically ranges from -100 dBm (weak) to -30 dBm (strong).
pub fn format_signal_bar(rssi: Option<i16>, no_color: bool) -> String {
    let Some(rssi) = rssi else {
        return "N/A".to_string();
    };

    // -30 dBm = excellent (10), -100 dBm = very weak (0)
    let filled = ((rssi + 100).clamp(0, 70) as f32 / 7.0).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));

    if no_color {
        format!("{} {:>3}", bar, rssi)
    } else if filled >= 7 {
        format!("{} {:>3}", bar.green(), rssi)
    } else if filled >= 4 {
        format!("{} {:>3}", bar.yellow(), rssi)
    } else {
        format!("{} {:>3}", bar.red(), rssi)
    }
}

/// Apply the table style: rounded borders, or none for plain output.
pub fn apply_table_style(table: &mut tabled::Table, plain: bool) {
    use tabled::settings::Style;
    if plain {
        table.with(Style::blank());
    } else {
        table.with(Style::rounded());
    }
}
