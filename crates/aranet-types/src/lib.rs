//! Platform-agnostic types for Aranet environmental sensors.
//!
//! This crate provides the value types shared by the store, the monitoring
//! core and the command-line front end.
//!
//! # Features
//!
//! - [`Reading`]: one normalized, timestamped measurement (temperature in °F)
//! - [`Field`]: closed selector over the numeric measurements
//! - [`Status`]: the device's air-quality tier
//! - BLE identifiers for recognizing Aranet advertisements
//!
//! # Example
//!
//! ```
//! use aranet_types::{Field, Reading, Status};
//! use time::OffsetDateTime;
//!
//! let reading = Reading::builder(OffsetDateTime::now_utc())
//!     .co2(650)
//!     .celsius(21.5)
//!     .humidity(40.0)
//!     .pressure(1009.8)
//!     .status(Status::Green)
//!     .build();
//!
//! assert_eq!(reading.value(Field::Co2), 650.0);
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::ParseError;
pub use types::{Field, Reading, ReadingBuilder, Status, celsius_to_fahrenheit};
pub use uuid as uuids;
