//! BLE advertisement data parsing for passive monitoring.
//!
//! Aranet4 devices broadcast their latest measurement in the manufacturer
//! data of every advertisement, so a monitor can follow a sensor without
//! ever connecting to it.
//!
//! # Requirements
//!
//! For advertisement data to be available, Smart Home integration must be
//! enabled on the device (Settings > Smart Home > Enable). Without it the
//! device still advertises, but the payload carries no measurement and
//! [`parse_advertisement`] returns `Ok(None)`.

use bytes::Buf;
use time::OffsetDateTime;

use aranet_types::{Reading, Status};

use crate::error::{Error, Result};

/// Length of a full Aranet4 manufacturer payload.
pub const ARANET4_PAYLOAD_LEN: usize = 22;

/// Length of the payload sent when Smart Home integration is off.
const ARANET4_BASIC_LEN: usize = 7;

/// Bit in the flags byte set when Smart Home integration is enabled.
const INTEGRATIONS_FLAG: u8 = 1 << 5;

/// Sensor data decoded from an Aranet4 advertisement, in device units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvertisementData {
    /// CO2 concentration in ppm.
    pub co2: u16,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Atmospheric pressure in hPa.
    pub pressure: f32,
    /// Relative humidity percentage (0-100).
    pub humidity: u8,
    /// Battery level percentage (0-100).
    pub battery: u8,
    /// CO2 status indicator.
    pub status: Status,
    /// Measurement interval in seconds.
    pub interval: u16,
    /// Seconds since the measurement was taken.
    pub age: u16,
    /// Advertisement counter (increments with each new reading).
    pub counter: Option<u8>,
    /// Raw manufacturer data flags.
    pub flags: u8,
}

impl AdvertisementData {
    /// Turn the advertised values into a [`Reading`].
    ///
    /// The measurement time is `received_at - age`, and the temperature is
    /// converted from °C to °F here, once.
    pub fn to_reading(&self, received_at: OffsetDateTime) -> Result<Reading> {
        let timestamp = received_at - time::Duration::seconds(i64::from(self.age));

        let reading = Reading::builder(timestamp)
            .co2(self.co2)
            .celsius(self.temperature)
            .humidity(f32::from(self.humidity))
            .pressure(self.pressure)
            .battery(self.battery)
            .status(self.status)
            .interval(self.interval)
            .try_build()?;

        Ok(reading)
    }
}

/// Temperature in °C from its raw 0.05 °C steps.
pub(crate) fn raw_to_celsius(raw: u16) -> f32 {
    f32::from(raw) * 0.05
}

/// Pressure in hPa from its raw 0.1 hPa steps.
pub(crate) fn raw_to_hpa(raw: u16) -> f32 {
    f32::from(raw) * 0.1
}

/// Parse advertisement data from raw manufacturer data bytes.
///
/// The manufacturer data should be from manufacturer ID 0x0702 (SAF Tehnika),
/// excluding the ID itself.
///
/// Returns `Ok(None)` for a well-formed advertisement that carries no
/// measurement (Smart Home integration disabled).
pub fn parse_advertisement(data: &[u8]) -> Result<Option<AdvertisementData>> {
    parse_advertisement_with_name(data, None)
}

/// Parse advertisement data with optional device name for better detection.
///
/// Aranet4 advertisements carry no device type prefix byte, so the payload
/// is recognized by the advertised name or by its length.
pub fn parse_advertisement_with_name(
    data: &[u8],
    name: Option<&str>,
) -> Result<Option<AdvertisementData>> {
    if data.is_empty() {
        return Err(Error::InvalidData(
            "Advertisement data is empty".to_string(),
        ));
    }

    let is_aranet4_by_name = name.is_some_and(|n| n.starts_with("Aranet4"));
    let is_aranet4_by_len = data.len() == ARANET4_BASIC_LEN || data.len() == ARANET4_PAYLOAD_LEN;

    if !is_aranet4_by_name && !is_aranet4_by_len {
        return Err(Error::InvalidData(format!(
            "Not an Aranet4 advertisement (first byte 0x{:02X}, {} bytes)",
            data[0],
            data.len()
        )));
    }

    if data[0] & INTEGRATIONS_FLAG == 0 {
        return Ok(None);
    }

    parse_aranet4_advertisement(data).map(Some)
}

/// Parse Aranet4 advertisement data.
///
/// Format (22 bytes, no device type prefix):
/// - bytes 0-7: Basic info (flags, version, etc.)
/// - bytes 8-9: CO2 (u16 LE)
/// - bytes 10-11: Temperature (u16 LE, *0.05 for °C)
/// - bytes 12-13: Pressure (u16 LE, *0.1 for hPa)
/// - byte 14: Humidity (u8)
/// - byte 15: Battery (u8)
/// - byte 16: Status (u8)
/// - bytes 17-18: Interval (u16 LE, seconds)
/// - bytes 19-20: Age (u16 LE, seconds)
/// - byte 21: Counter (u8)
fn parse_aranet4_advertisement(data: &[u8]) -> Result<AdvertisementData> {
    // The counter byte is optional on older firmware
    if data.len() < ARANET4_PAYLOAD_LEN - 1 {
        return Err(Error::InvalidData(format!(
            "Aranet4 advertisement requires {} bytes, got {}",
            ARANET4_PAYLOAD_LEN,
            data.len()
        )));
    }

    let flags = data[0];
    // Skip to sensor data at offset 8
    let mut buf = &data[8..];
    let co2 = buf.get_u16_le();
    let temp_raw = buf.get_u16_le();
    let pressure_raw = buf.get_u16_le();
    let humidity = buf.get_u8();
    let battery = buf.get_u8();
    let status = Status::from(buf.get_u8());
    let interval = buf.get_u16_le();
    let age = buf.get_u16_le();
    let counter = if buf.has_remaining() {
        Some(buf.get_u8())
    } else {
        None
    };

    Ok(AdvertisementData {
        co2,
        temperature: raw_to_celsius(temp_raw),
        pressure: raw_to_hpa(pressure_raw),
        humidity,
        battery,
        status,
        interval,
        age,
        counter,
        flags,
    })
}


/// Property-based tests for advertisement parsing.
///
/// Run with:
/// ```bash
/// cargo test -p aranet-core advertisement::proptests
/// ```
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Parsing random advertisement bytes should never panic.
        /// It may return an error, but should always be safe.
        #[test]
        fn parse_advertisement_never_panics(data: Vec<u8>) {
            let _ = parse_advertisement(&data);
        }

        /// Parsing with valid Aranet4 length (22 bytes) should not panic.
        #[test]
        fn parse_aranet4_advertisement_never_panics(data in proptest::collection::vec(any::<u8>(), 22)) {
            let _ = parse_advertisement(&data);
        }

        /// Any named Aranet4 payload length is handled without panicking.
        #[test]
        fn parse_named_advertisement_never_panics(data in proptest::collection::vec(any::<u8>(), 0..40)) {
            let _ = parse_advertisement_with_name(&data, Some("Aranet4 1A2B3"));
        }
    }
}
