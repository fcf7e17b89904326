//! Core types for Aranet sensor data.

use core::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::error::ParseError;

/// CO2 level status indicator reported by the device.
///
/// Only used to color the display.
///
/// # Ordering
///
/// Status values are ordered by severity: `Error < Green < Yellow < Red`.
///
/// ```
/// use aranet_types::Status;
///
/// assert_eq!(Status::Yellow.label(), "amber");
/// assert!(Status::Red > Status::Yellow);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(u8)]
pub enum Status {
    /// Error or invalid reading.
    Error = 0,
    /// CO2 level is good (green).
    Green = 1,
    /// CO2 level is moderate (amber).
    Yellow = 2,
    /// CO2 level is high (red).
    Red = 3,
}

impl Status {
    /// Short color label used by renderers ("good", "amber", "red").
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Status::Error => "error",
            Status::Green => "good",
            Status::Yellow => "amber",
            Status::Red => "red",
        }
    }
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        match value {
            1 => Status::Green,
            2 => Status::Yellow,
            3 => Status::Red,
            _ => Status::Error,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Error => write!(f, "Error"),
            Status::Green => write!(f, "Good"),
            Status::Yellow => write!(f, "Moderate"),
            Status::Red => write!(f, "High"),
        }
    }
}

/// A numeric measurement carried by every [`Reading`].
///
/// This is a closed set: statistics, rank queries and table rendering all
/// select a column through this enum instead of looking fields up by name.
///
/// ```
/// use aranet_types::Field;
///
/// assert_eq!(Field::ALL.len(), 4);
/// assert_eq!(Field::Co2.name(), "co2");
/// assert_eq!("humidity".parse::<Field>().unwrap(), Field::Humidity);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Field {
    /// CO2 concentration in ppm.
    Co2,
    /// Temperature in °F.
    Temperature,
    /// Relative humidity percentage.
    Humidity,
    /// Atmospheric pressure in hPa.
    Pressure,
}

impl Field {
    /// Every field, in display and alert order.
    pub const ALL: [Field; 4] = [
        Field::Co2,
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
    ];

    /// Lowercase name, as used in alert text.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Field::Co2 => "co2",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
        }
    }

    /// Column holding this field in the history table.
    #[must_use]
    pub fn column(&self) -> &'static str {
        self.name()
    }

    /// Display unit.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Field::Co2 => "ppm",
            Field::Temperature => "°F",
            Field::Humidity => "%",
            Field::Pressure => "hPa",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "co2" => Ok(Field::Co2),
            "temperature" | "temp" => Ok(Field::Temperature),
            "humidity" | "humid" => Ok(Field::Humidity),
            "pressure" | "press" => Ok(Field::Pressure),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

/// Convert a device-native Celsius temperature to Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// One normalized, timestamped sensor measurement.
///
/// Readings are immutable: fields are private and only reachable through
/// accessors. Temperature is always stored in °F; the conversion from the
/// device's Celsius happens once, inside [`ReadingBuilder::celsius`].
///
/// Live readings carry `battery`, `status` and `interval`; readings loaded
/// from history do not.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    timestamp: OffsetDateTime,
    co2: u16,
    temperature: f32,
    humidity: f32,
    pressure: f32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    battery: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    status: Option<Status>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    interval: Option<u16>,
}

impl Reading {
    /// Start building a reading measured at `timestamp`.
    ///
    /// The timestamp is converted to UTC and truncated to whole seconds.
    pub fn builder(timestamp: OffsetDateTime) -> ReadingBuilder {
        ReadingBuilder::new(timestamp)
    }

    /// When the measurement was taken (UTC, second resolution).
    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// CO2 concentration in ppm.
    #[must_use]
    pub fn co2(&self) -> u16 {
        self.co2
    }

    /// Temperature in °F.
    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Temperature in °C, derived from the stored °F value.
    ///
    /// Only used by exchange formats that record Celsius.
    #[must_use]
    pub fn temperature_celsius(&self) -> f32 {
        (self.temperature - 32.0) * 5.0 / 9.0
    }

    /// Relative humidity percentage.
    #[must_use]
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    /// Atmospheric pressure in hPa.
    #[must_use]
    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    /// Battery level, live readings only.
    #[must_use]
    pub fn battery(&self) -> Option<u8> {
        self.battery
    }

    /// Device status tier, live readings only.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Device sampling interval in seconds, live readings only.
    #[must_use]
    pub fn interval(&self) -> Option<u16> {
        self.interval
    }

    /// Value of a numeric field, widened to `f64` for statistics.
    #[must_use]
    pub fn value(&self, field: Field) -> f64 {
        match field {
            Field::Co2 => f64::from(self.co2),
            Field::Temperature => f64::from(self.temperature),
            Field::Humidity => f64::from(self.humidity),
            Field::Pressure => f64::from(self.pressure),
        }
    }

    /// Time elapsed since the measurement, saturating at zero for
    /// timestamps in the future.
    #[must_use]
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        let elapsed = now - self.timestamp;
        if elapsed.is_negative() {
            Duration::ZERO
        } else {
            elapsed.unsigned_abs()
        }
    }

    /// Seconds elapsed since the measurement.
    #[must_use]
    pub fn age_secs(&self, now: OffsetDateTime) -> u64 {
        self.age(now).as_secs()
    }
}

/// Builder for [`Reading`].
///
/// ```
/// use aranet_types::Reading;
/// use time::macros::datetime;
///
/// let reading = Reading::builder(datetime!(2024-01-15 10:30:00 UTC))
///     .co2(800)
///     .celsius(20.0)
///     .humidity(45.0)
///     .pressure(1013.2)
///     .build();
///
/// assert_eq!(reading.temperature(), 68.0);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ReadingBuilder {
    reading: Reading,
}

impl ReadingBuilder {
    fn new(timestamp: OffsetDateTime) -> Self {
        let timestamp = timestamp.to_offset(UtcOffset::UTC);
        let timestamp = timestamp.replace_nanosecond(0).unwrap_or(timestamp);
        Self {
            reading: Reading {
                timestamp,
                co2: 0,
                temperature: 0.0,
                humidity: 0.0,
                pressure: 0.0,
                battery: None,
                status: None,
                interval: None,
            },
        }
    }

    /// Set CO2 concentration in ppm.
    pub fn co2(mut self, co2: u16) -> Self {
        self.reading.co2 = co2;
        self
    }

    /// Set the temperature from a device-native Celsius value.
    pub fn celsius(mut self, celsius: f32) -> Self {
        self.reading.temperature = celsius_to_fahrenheit(celsius);
        self
    }

    /// Set the temperature from an already-normalized Fahrenheit value.
    pub fn fahrenheit(mut self, fahrenheit: f32) -> Self {
        self.reading.temperature = fahrenheit;
        self
    }

    /// Set relative humidity (0-100).
    pub fn humidity(mut self, humidity: f32) -> Self {
        self.reading.humidity = humidity;
        self
    }

    /// Set pressure in hPa.
    pub fn pressure(mut self, pressure: f32) -> Self {
        self.reading.pressure = pressure;
        self
    }

    /// Set battery level (0-100).
    pub fn battery(mut self, battery: u8) -> Self {
        self.reading.battery = Some(battery);
        self
    }

    /// Set device status.
    pub fn status(mut self, status: Status) -> Self {
        self.reading.status = Some(status);
        self
    }

    /// Set the device sampling interval in seconds.
    pub fn interval(mut self, interval: u16) -> Self {
        self.reading.interval = Some(interval);
        self
    }

    /// Build the reading without validation.
    #[must_use]
    pub fn build(self) -> Reading {
        self.reading
    }

    /// Build the reading, rejecting values no sensor can report.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if humidity is outside 0-100,
    /// battery is above 100, or any real-valued field is not finite.
    pub fn try_build(self) -> Result<Reading, ParseError> {
        let r = &self.reading;

        if !r.temperature.is_finite() || !r.pressure.is_finite() || !r.humidity.is_finite() {
            return Err(ParseError::InvalidValue(
                "temperature, humidity and pressure must be finite".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&r.humidity) {
            return Err(ParseError::InvalidValue(format!(
                "humidity {} outside 0-100",
                r.humidity
            )));
        }
        if let Some(battery) = r.battery
            && battery > 100
        {
            return Err(ParseError::InvalidValue(format!(
                "battery {battery} above 100"
            )));
        }

        Ok(self.reading)
    }
}
