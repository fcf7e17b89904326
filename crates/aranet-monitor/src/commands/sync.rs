//! Sync command implementation.
//!
//! Connects to the device and stores the records it holds that are newer
//! than recorded history.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use aranet_core::{DeviceLink, SyncOptions, sync_history};
use aranet_store::{ImportResult, Store};
use tracing::warn;

use crate::cli::DeviceArgs;
use crate::config::Config;
use crate::style;
use crate::util::require_device;

pub async fn cmd_sync(
    device: DeviceArgs,
    read_delay: u64,
    database: &Path,
    quiet: bool,
    config: &Config,
) -> Result<()> {
    let identifier =
        require_device(device.device, device.scan_timeout, quiet, config).await?;
    let mut store = Store::open(database)
        .with_context(|| format!("Failed to open database: {}", database.display()))?;
    let options = SyncOptions::new()
        .scan_timeout_secs(device.scan_timeout)
        .read_delay(Duration::from_millis(read_delay));

    let spinner = (!quiet).then(|| style::download_spinner(&identifier));
    let result = download(&identifier, &mut store, &options).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result?;

    if !quiet {
        println!(
            "Read {} records from device: {} new, {} already recorded",
            result.read, result.imported, result.skipped
        );
    }
    Ok(())
}

/// Connect, sync and always disconnect.
async fn download(
    identifier: &str,
    store: &mut Store,
    options: &SyncOptions,
) -> Result<ImportResult> {
    let link = DeviceLink::connect(identifier, options)
        .await
        .with_context(|| format!("Failed to connect to {}", identifier))?;

    let result = sync_history(&link, store, options).await;
    if let Err(e) = link.disconnect().await {
        warn!("Failed to disconnect: {}", e);
    }
    result.context("History download failed")
}
