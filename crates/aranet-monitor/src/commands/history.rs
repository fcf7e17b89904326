//! History command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use aranet_store::{HistoryQuery, HistoryStore, Store};

use crate::cli::OutputFormat;
use crate::format::{
    format_history_summary, format_history_summary_json, format_records_json, format_records_text,
};
use crate::util::parse_datetime;

/// Arguments for the history command.
pub struct HistoryArgs {
    pub format: OutputFormat,
    pub list: bool,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: u32,
}

pub fn cmd_history(args: HistoryArgs, database: &Path, no_color: bool) -> Result<()> {
    let HistoryArgs {
        format,
        list,
        since,
        until,
        limit,
    } = args;

    // Parse date filters upfront to fail fast
    let since = since.as_deref().map(|s| parse_datetime(s, false)).transpose()?;
    let until = until.as_deref().map(|s| parse_datetime(s, true)).transpose()?;

    let store = Store::open(database)
        .with_context(|| format!("Failed to open database: {}", database.display()))?;

    let content = if list {
        let mut query = HistoryQuery::new();
        if let Some(since) = since {
            query = query.since(since);
        }
        if let Some(until) = until {
            query = query.until(until);
        }
        if limit > 0 {
            query = query.limit(limit);
        }

        let records = store.query(&query).context("Failed to query history")?;
        match format {
            OutputFormat::Json => format_records_json(&records)?,
            OutputFormat::Text => format_records_text(&records, no_color),
        }
    } else {
        let stats = store.aggregate().context("Failed to summarize history")?;
        let latest = store.latest().context("Failed to read latest record")?;
        match format {
            OutputFormat::Json => format_history_summary_json(&stats, latest.as_ref())?,
            OutputFormat::Text => format_history_summary(&stats, latest.as_ref()),
        }
    };

    print!("{}", content);
    Ok(())
}
