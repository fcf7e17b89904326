//! Trait abstractions at the edges of the core.
//!
//! [`Notifier`] and [`Renderer`] let the monitor run against a terminal and
//! a push provider in production, and against recording fakes in tests.
//! [`GattLink`] does the same for a connected device during a history
//! download.
//!
//! # Example
//!
//! ```ignore
//! use aranet_core::{Notification, Notifier, Result};
//!
//! struct Stdout;
//!
//! #[async_trait::async_trait]
//! impl Notifier for Stdout {
//!     async fn send(&self, notification: &Notification) -> Result<()> {
//!         println!("{}", notification.title);
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::monitor::{AgeLine, LiveFrame};
use crate::notify::Notification;

/// Delivers alert notifications.
///
/// Implementations must be shareable across tasks: the monitor hands each
/// send to its own spawned task.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Presents the live session.
pub trait Renderer {
    /// Show a newly accepted reading.
    fn show_reading(&mut self, frame: &LiveFrame);

    /// Refresh the age of the current reading.
    fn show_age(&mut self, line: &AgeLine);

    /// Body text for a notification about `frame`.
    fn notification_body(&self, frame: &LiveFrame) -> String;
}

/// Characteristic reads and writes on a connected device.
#[async_trait]
pub trait GattLink: Send + Sync {
    /// Read the current value of a characteristic.
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>>;

    /// Write a value to a characteristic, waiting for the response.
    async fn write(&self, characteristic: Uuid, data: &[u8]) -> Result<()>;
}
