//! Command implementations for the CLI.

mod config;
mod exchange;
mod history;
mod scan;
mod sync;
mod watch;

pub use config::cmd_config;
pub use exchange::{cmd_export, cmd_import};
pub use history::{HistoryArgs, cmd_history};
pub use scan::cmd_scan;
pub use sync::cmd_sync;
pub use watch::{WatchArgs, cmd_watch};
