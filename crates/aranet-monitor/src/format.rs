//! Output formatting for the live frame, history and scan results.

use anyhow::Result;
use aranet_core::{AgeLine, DiscoveredDevice, LiveFrame, SessionSummary};
use aranet_store::HistoryStats;
use aranet_types::{Field, Reading, Status};
use serde::Serialize;
use time::OffsetDateTime;

use crate::style;

/// Width of the history summary block.
const SUMMARY_WIDTH: usize = 34;

/// How values are highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// ANSI escapes for a terminal.
    Ansi,
    /// `<font>` tags for a notification body.
    Html,
    /// No highlighting.
    Plain,
}

impl Markup {
    /// Markup for terminal output.
    pub fn terminal(no_color: bool) -> Self {
        if no_color { Markup::Plain } else { Markup::Ansi }
    }

    fn paint(self, text: &str, status: Option<Status>) -> String {
        match self {
            Markup::Ansi => style::paint_status(text, status, false),
            Markup::Html => match status.and_then(style::status_color) {
                Some(color) => format!("<font color='{}'>{}</font>", color, text),
                None => text.to_string(),
            },
            Markup::Plain => text.to_string(),
        }
    }
}

/// Serialize a value as pretty JSON with a trailing newline.
pub fn as_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

/// Format a timestamp in the local time zone.
pub fn format_local_time(timestamp: OffsetDateTime) -> String {
    chrono::DateTime::from_timestamp(timestamp.unix_timestamp(), 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%m/%d/%Y %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

// ============================================================================
// Live frame
// ============================================================================

/// Rank and percentile suffix for a field, empty without history.
fn standing_suffix(frame: &LiveFrame, field: Field) -> String {
    frame
        .standings
        .get(field)
        .map(|s| format!("  #{} ({}%)", s.rank, s.percentile))
        .unwrap_or_default()
}

/// `/interval` when the interval is known, otherwise nothing.
fn format_interval(interval: Option<u16>) -> String {
    interval.map(|i| format!("/{}", i)).unwrap_or_default()
}

/// Format an accepted reading as a block of labelled lines.
///
/// The last line is the age line, so a terminal can keep refreshing it in
/// place with [`format_age_line`].
pub fn format_frame(frame: &LiveFrame, markup: Markup) -> String {
    let current = &frame.current;
    let co2 = markup.paint(&current.co2().to_string(), current.status());

    let mut lines = vec![
        format!(
            "  CO2:           {} ppm {}{}",
            co2,
            style::format_change(frame.change(Field::Co2)),
            standing_suffix(frame, Field::Co2)
        ),
        format!(
            "  Temperature:   {:.1} °F {}{}",
            current.temperature(),
            style::format_change(frame.change(Field::Temperature)),
            standing_suffix(frame, Field::Temperature)
        ),
        format!(
            "  Humidity:      {:.0}% {}{}",
            current.humidity(),
            style::format_change(frame.change(Field::Humidity)),
            standing_suffix(frame, Field::Humidity)
        ),
        format!(
            "  Pressure:      {:.1} hPa {}{}",
            current.pressure(),
            style::format_change(frame.change(Field::Pressure)),
            standing_suffix(frame, Field::Pressure)
        ),
    ];
    if let Some(battery) = current.battery() {
        lines.push(format!("  Battery:       {}%", battery));
    }
    if !frame.persisted {
        lines.push("  Not recorded:  a measurement was missed".to_string());
    }
    lines.push(format!(
        "  Age:           {}{}",
        frame.age_secs,
        format_interval(current.interval())
    ));

    lines.join("\n")
}

/// Format the refreshed age line, padded to overwrite a longer one.
pub fn format_age_line(line: &AgeLine) -> String {
    format!(
        "  Age:           {}{}     ",
        line.age_secs,
        format_interval(line.interval)
    )
}

/// Format the counters of a finished session.
pub fn format_session_summary(summary: &SessionSummary) -> String {
    format!(
        "Session: {} advertisements, {} readings, {} recorded, {} alerts\n",
        summary.events_seen, summary.accepted, summary.persisted, summary.alerts_sent
    )
}

// ============================================================================
// History
// ============================================================================

fn format_temperature(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.0}°", v))
}

fn format_humidity(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.0}%", v))
}

fn format_grouped(value: Option<f64>) -> String {
    value.map_or_else(
        || "-".to_string(),
        |v| style::group_thousands(v.round() as i64),
    )
}

fn summary_row(
    label: &str,
    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    co2: Option<f64>,
) -> String {
    format!(
        "{:<6}{:>7}{:>7}{:>7}{:>7}",
        label,
        format_temperature(temperature),
        format_humidity(humidity),
        format_grouped(pressure),
        format_grouped(co2)
    )
}

/// Format the history summary: record count, when the last record was taken,
/// and min/max/mean of each field next to the latest values.
pub fn format_history_summary(stats: &HistoryStats, latest: Option<&Reading>) -> String {
    let rule = "-".repeat(SUMMARY_WIDTH);
    let last_recorded = latest.map_or_else(
        || "never".to_string(),
        |r| format_local_time(r.timestamp()),
    );

    let mut lines = vec![
        rule.clone(),
        format!("last recorded{:>21}", last_recorded),
        format!(
            "records{:>27}",
            style::group_thousands(stats.count as i64)
        ),
        rule,
        format!("{:>width$}", "temp  humid  press    co2", width = SUMMARY_WIDTH),
    ];

    let rows: [(&str, fn(&aranet_store::FieldStats) -> Option<f64>); 3] = [
        ("min", |s| s.min),
        ("max", |s| s.max),
        ("mean", |s| s.mean),
    ];
    for (label, pick) in rows {
        lines.push(summary_row(
            label,
            pick(&stats.temperature),
            pick(&stats.humidity),
            pick(&stats.pressure),
            pick(&stats.co2),
        ));
    }

    lines.push(summary_row(
        "latest",
        latest.map(|r| r.value(Field::Temperature)),
        latest.map(|r| r.value(Field::Humidity)),
        latest.map(|r| r.value(Field::Pressure)),
        latest.map(|r| r.value(Field::Co2)),
    ));

    lines.join("\n") + "\n"
}

/// Format the history summary as JSON.
pub fn format_history_summary_json(
    stats: &HistoryStats,
    latest: Option<&Reading>,
) -> Result<String> {
    #[derive(Serialize)]
    struct HistorySummary<'a> {
        stats: &'a HistoryStats,
        latest: Option<&'a Reading>,
    }

    as_json(&HistorySummary { stats, latest })
}

/// Format stored records as a table, newest first.
pub fn format_records_text(records: &[Reading], no_color: bool) -> String {
    use tabled::builder::Builder;

    if records.is_empty() {
        return "No history records found.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Time", "CO2", "Temp (F)", "Humidity", "Pressure"]);
    for record in records {
        builder.push_record([
            format_local_time(record.timestamp()),
            format!("{} ppm", record.co2()),
            format!("{:.1}", record.temperature()),
            format!("{:.0}%", record.humidity()),
            format!("{:.1} hPa", record.pressure()),
        ]);
    }

    let mut table = builder.build();
    style::apply_table_style(&mut table, no_color);
    format!("{}\n", table)
}

/// Format stored records as JSON.
pub fn format_records_json(records: &[Reading]) -> Result<String> {
    as_json(&records)
}

// ============================================================================
// Scan
// ============================================================================

/// Format scan results as a table.
pub fn format_scan_text(devices: &[DiscoveredDevice], no_color: bool) -> String {
    use tabled::builder::Builder;

    if devices.is_empty() {
        return "No Aranet devices found.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Name", "Signal", "Identifier"]);
    for device in devices {
        builder.push_record([
            device.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            style::format_signal_bar(device.rssi, no_color),
            device.identifier.clone(),
        ]);
    }

    let mut table = builder.build();
    style::apply_table_style(&mut table, no_color);
    format!("Found {} device(s):\n{}\n", devices.len(), table)
}

/// Format scan results as JSON.
pub fn format_scan_json(devices: &[DiscoveredDevice]) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        devices: Vec<DeviceJson<'a>>,
    }

    #[derive(Serialize)]
    struct DeviceJson<'a> {
        name: Option<&'a str>,
        address: &'a str,
        identifier: &'a str,
        rssi: Option<i16>,
        is_aranet: bool,
    }

    let result = ScanResult {
        count: devices.len(),
        devices: devices
            .iter()
            .map(|d| DeviceJson {
                name: d.name.as_deref(),
                address: &d.address,
                identifier: &d.identifier,
                rssi: d.rssi,
                is_aranet: d.is_aranet,
            })
            .collect(),
    };

    as_json(&result)
}
