//! Live monitor for Aranet4 sensors.
//!
//! Follows one device through its Bluetooth advertisements, records every new
//! measurement in a local history database, and pushes an alert when CO2 is
//! rising past a limit, temperature leaves its range, or a reading sets a new
//! record. `sync` fills in what was missed from the records kept on the
//! device.

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod render;
mod style;
mod util;

use cli::{Cli, Commands, OutputFormat};
use config::{Config, resolve_database};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "aranet-monitor", &mut io::stdout());
        return Ok(());
    }

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so they never mix into command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    if let Commands::Config { action } = cli.command {
        return commands::cmd_config(action, &config_path);
    }

    let config = Config::load(&config_path)?;
    let no_color = cli.no_color || config.no_color;
    let database = resolve_database(cli.database.clone(), &config);

    match cli.command {
        Commands::Watch {
            device,
            pushover,
            gap_policy,
            dry_run,
        } => {
            let args = commands::WatchArgs {
                device,
                pushover,
                gap_policy,
                dry_run,
                database,
                quiet: cli.quiet,
                no_color,
            };
            commands::cmd_watch(args, &config).await?;
        }
        Commands::Sync { device, read_delay } => {
            commands::cmd_sync(device, read_delay, &database, cli.quiet, &config).await?;
        }
        Commands::History {
            format,
            json,
            list,
            since,
            until,
            limit,
        } => {
            let format = if json { OutputFormat::Json } else { format };
            let args = commands::HistoryArgs {
                format,
                list,
                since,
                until,
                limit,
            };
            commands::cmd_history(args, &database, no_color)?;
        }
        Commands::Scan {
            timeout,
            format,
            all,
        } => {
            commands::cmd_scan(timeout, format, all, cli.quiet, no_color).await?;
        }
        Commands::Import { file, csv } => {
            commands::cmd_import(&file, &csv, &database, cli.quiet, &config)?;
        }
        Commands::Export { file, csv } => {
            commands::cmd_export(&file, &csv, &database, cli.quiet, &config)?;
        }
        // Handled before the config is loaded
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}
