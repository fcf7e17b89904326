//! Error types for data parsing in aranet-types.

use thiserror::Error;

/// Errors that can occur when decoding or constructing sensor data.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in aranet-core).
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// A decoded value is outside the range any sensor can report.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Field name does not name a measurement.
    #[error("Unknown field: {0} (expected co2, temperature, humidity or pressure)")]
    UnknownField(String),
}

