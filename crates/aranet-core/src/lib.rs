//! Live monitoring core for Aranet4 environmental sensors.
//!
//! This crate follows an Aranet4 passively through its BLE advertisements,
//! reconciles what it hears against a persisted reading history, and
//! decides when a reading deserves a push notification.
//!
//! # Features
//!
//! - **Device discovery**: Finite BLE scans for nearby Aranet devices
//! - **Advertisement listening**: Decoded readings forwarded over a channel
//! - **Reconciliation**: Repeated broadcasts collapsed, missed measurements detected
//! - **Standings**: Rank and percentile of each value against history
//! - **Alerts**: Threshold rules with notification expiry
//! - **History sync**: Records kept on the device downloaded over GATT
//! - **Notifications**: Pushover delivery (`pushover` feature, on by default)
//!
//! # Platform Differences
//!
//! Device identification varies by platform:
//!
//! - **macOS**: Devices are identified by a UUID assigned by CoreBluetooth. It is
//!   stable for a given device on a given Mac, but differs between Macs.
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC address
//!   (e.g., `AA:BB:CC:DD:EE:FF`).
//!
//! [`DiscoveredDevice::identifier`] holds whichever applies, and is what
//! [`MonitorConfig::device`] expects.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aranet_core::passive::{AdvertisementListener, ListenerOptions};
//! use aranet_core::{LogNotifier, Monitor, MonitorConfig, ScanOptions, scan};
//! # use aranet_core::{AgeLine, LiveFrame, Renderer};
//! # struct Plain;
//! # impl Renderer for Plain {
//! #     fn show_reading(&mut self, f: &LiveFrame) { println!("{}", f.current.co2()); }
//! #     fn show_age(&mut self, _: &AgeLine) {}
//! #     fn notification_body(&self, f: &LiveFrame) -> String { f.current.co2().to_string() }
//! # }
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = scan::find_single_device(ScanOptions::default()).await?;
//!     let store = aranet_store::Store::open_default()?;
//!
//!     let cancel = CancellationToken::new();
//!     let (listener, events) = AdvertisementListener::new(ListenerOptions::default());
//!     listener.start(cancel.clone());
//!
//!     let config = MonitorConfig::new(device.identifier);
//!     let mut monitor = Monitor::new(config, store, Plain, Arc::new(LogNotifier))?;
//!     let summary = monitor.run(events, cancel).await?;
//!     println!("{} readings stored", summary.persisted);
//!     Ok(())
//! }
//! ```

pub mod advertisement;
pub mod alerts;
pub mod error;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod passive;
pub mod reconcile;
pub mod scan;
pub mod standing;
pub mod traits;
pub mod util;

// Re-export the uuid module from aranet-types
pub use aranet_types::uuid;

// Core exports
pub use advertisement::{AdvertisementData, parse_advertisement};
pub use alerts::{AlertBatch, AlertEvaluator, AlertThresholds};
pub use error::{DeviceNotFoundReason, Error, Result};
pub use history::{DeviceLink, HistoryInfo, SyncOptions, sync_history};
pub use monitor::{
    AgeLine, LiveFrame, Monitor, MonitorConfig, Outcome, SessionState, SessionSummary,
};
pub use notify::{LogNotifier, Notification};
#[cfg(feature = "pushover")]
pub use notify::{PUSHOVER_ENDPOINT, PushoverNotifier};
pub use passive::{Advertisement, AdvertisementListener, ListenerOptions};
pub use reconcile::{Decision, GapPolicy, Reconciler, Reconciliation};
pub use scan::{DiscoveredDevice, ScanOptions};
pub use standing::{Standing, Standings};
pub use traits::{GattLink, Notifier, Renderer};
pub use util::{create_identifier, format_peripheral_id, same_device};

// Re-export from aranet-types
pub use aranet_types::{Field, Reading, Status};
