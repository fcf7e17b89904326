//! Watch command implementation.
//!
//! Follows one device through its advertisements, so no connection is held
//! and any number of clients can watch the same sensor.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use aranet_core::{
    AdvertisementListener, GapPolicy, ListenerOptions, LogNotifier, Monitor, MonitorConfig,
    Notifier, SessionSummary,
};
use aranet_store::{HistoryStore, MemoryStore, Store};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{DeviceArgs, PushoverArgs};
use crate::config::{Config, resolve_pushover};
use crate::format::format_session_summary;
use crate::render::TerminalRenderer;
use crate::util::require_device;

/// Arguments for the watch command.
pub struct WatchArgs {
    pub device: DeviceArgs,
    pub pushover: PushoverArgs,
    pub gap_policy: Option<GapPolicy>,
    pub dry_run: bool,
    pub database: PathBuf,
    pub quiet: bool,
    pub no_color: bool,
}

pub async fn cmd_watch(args: WatchArgs, config: &Config) -> Result<()> {
    let WatchArgs {
        device,
        pushover,
        gap_policy,
        dry_run,
        database,
        quiet,
        no_color,
    } = args;

    let identifier =
        require_device(device.device, device.scan_timeout, quiet, config).await?;
    let monitor_config = MonitorConfig::new(identifier.as_str())
        .gap_policy(gap_policy.unwrap_or(config.gap_policy))
        .thresholds(config.alerts);
    let notifier = build_notifier(&pushover, config)?;
    let renderer = TerminalRenderer::stdout(no_color);

    if !quiet {
        let header = if no_color {
            format!("Watching: {}", identifier)
        } else {
            format!("Watching: {}", identifier.cyan())
        };
        eprintln!("{}", header);
        if dry_run {
            eprintln!("Dry run: readings are kept in memory only");
        } else {
            eprintln!("History: {}", database.display());
        }
        eprintln!("Press Ctrl+C to stop");
        eprintln!("{}", "-".repeat(50));
    }

    let summary = if dry_run {
        run_session(monitor_config, MemoryStore::new(), renderer, notifier).await?
    } else {
        let store = Store::open(&database)
            .with_context(|| format!("Failed to open database: {}", database.display()))?;
        run_session(monitor_config, store, renderer, notifier).await?
    };

    if !quiet {
        eprint!("\n\n{}", format_session_summary(&summary));
    }
    Ok(())
}

/// Push through Pushover when credentials are available, otherwise log.
fn build_notifier(args: &PushoverArgs, config: &Config) -> Result<Arc<dyn Notifier>> {
    if args.no_notify {
        info!("Notifications disabled; alerts are only logged");
        return Ok(Arc::new(LogNotifier));
    }

    match resolve_pushover(
        args.pushover_token.clone(),
        args.pushover_user.clone(),
        config,
    ) {
        #[cfg(feature = "pushover")]
        Some((token, user)) => {
            let notifier = aranet_core::PushoverNotifier::new(token, user)
                .context("Invalid Pushover credentials")?;
            Ok(Arc::new(notifier))
        }
        #[cfg(not(feature = "pushover"))]
        Some(_) => {
            warn!("Built without Pushover support; alerts are only logged");
            Ok(Arc::new(LogNotifier))
        }
        None => {
            info!("Pushover not configured; alerts are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Listen and monitor until Ctrl+C or the listener stops.
async fn run_session<S: HistoryStore>(
    config: MonitorConfig,
    store: S,
    renderer: TerminalRenderer,
    notifier: Arc<dyn Notifier>,
) -> Result<SessionSummary> {
    let mut monitor =
        Monitor::new(config, store, renderer, notifier).context("Failed to read history")?;

    let cancel = CancellationToken::new();
    let (listener, events) = AdvertisementListener::new(ListenerOptions::default());
    let listener_handle = listener.start(cancel.clone());

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = monitor.run(events, cancel.clone()).await;
    cancel.cancel();
    ctrl_c.abort();

    match listener_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(anyhow!(e).context("Advertisement listener failed")),
        Err(e) => warn!("Advertisement listener task ended abnormally: {}", e),
    }

    result.context("Monitoring stopped")
}
