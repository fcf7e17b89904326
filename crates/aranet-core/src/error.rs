//! Error types for aranet-core.
//!
//! # Which errors end a session
//!
//! | Error | Effect |
//! |-------|--------|
//! | [`Error::DeviceNotFound`] | Fatal at session start; nothing to monitor |
//! | [`Error::Bluetooth`] | Fatal at session start; the listener stops if it occurs later |
//! | [`Error::Store`] | Fatal; gap detection needs the true latest record |
//! | [`Error::InvalidData`] | Not fatal for an advertisement, which is dropped; ends a history download |
//! | [`Error::Timeout`] | Ends a history download; nothing partial is stored |
//! | [`Error::Notify`] | Not fatal; logged and dropped |
//! | [`Error::InvalidConfig`] | Fix the configuration and restart |

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while discovering devices or monitoring readings.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Failed to decode data received from a device.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A GATT operation took too long.
    #[error("Timed out after {duration:?} waiting to {operation}")]
    Timeout {
        /// What was being waited for.
        operation: String,
        /// How long it waited.
        duration: Duration,
    },

    /// The connected device lacks a characteristic.
    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(uuid::Uuid),

    /// History store failure.
    #[error("History store error: {0}")]
    Store(#[from] aranet_store::Error),

    /// HTTP request to a notification provider failed.
    #[cfg(feature = "pushover")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A notification provider rejected a message.
    #[error("Notification rejected: {0}")]
    Notify(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reason why a device was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// No devices found during scan.
    NoDevicesInRange,
    /// More than one device answered and none was chosen.
    Ambiguous { count: usize },
    /// The requested device did not answer a scan.
    NotInRange { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no devices in range"),
            Self::Ambiguous { count } => {
                write!(f, "{} devices in range, pass one explicitly", count)
            }
            Self::NotInRange { identifier } => write!(f, "{} is not in range", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<aranet_types::ParseError> for Error {
    fn from(err: aranet_types::ParseError) -> Self {
        match err {
            aranet_types::ParseError::InvalidValue(msg) => Error::InvalidData(msg),
            // Handle future ParseError variants (non_exhaustive)
            _ => Error::InvalidData(format!("Parse error: {}", err)),
        }
    }
}

/// Result type alias using aranet-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
