//! Device discovery and scanning.
//!
//! Discovery is a finite scan: it runs for a fixed duration and returns
//! whatever answered. Callers decide what to do with the result;
//! [`find_single_device`] is the common case of "use the one sensor in range".

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::util::create_identifier;
use aranet_types::uuid::{MANUFACTURER_ID, SAF_TEHNIKA_SERVICE_NEW, SAF_TEHNIKA_SERVICE_OLD};

/// Information about a discovered Aranet device.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// The device name (e.g., "Aranet4 12345").
    pub name: Option<String>,
    /// The platform peripheral ID.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `identifier` instead).
    pub address: String,
    /// Stable identifier (peripheral ID on macOS, address on other platforms).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the device looks like an Aranet device.
    pub is_aranet: bool,
    /// Raw manufacturer data from advertisement (if available).
    pub manufacturer_data: Option<Vec<u8>>,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return devices that appear to be Aranet devices.
    pub filter_aranet_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            filter_aranet_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Scan for all BLE devices, not just Aranet.
    pub fn all_devices(mut self) -> Self {
        self.filter_aranet_only = false;
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for devices in range.
///
/// An empty list indicates no devices were found (not an error).
///
/// # Errors
///
/// Returns an error if:
/// - No Bluetooth adapter is available
/// - Bluetooth is not enabled
/// - The scan could not be started or stopped
pub async fn discover(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    discover_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
pub async fn discover_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral, options.filter_aranet_only).await {
            Ok(Some(device)) => {
                info!("Found device: {} ({:?})", device.identifier, device.name);
                discovered.push(device);
            }
            Ok(None) => {
                // Not an Aranet device or filtered out
            }
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

/// Scan once and return the only Aranet device in range.
///
/// # Errors
///
/// Returns [`Error::DeviceNotFound`] when no device, or more than one,
/// answered the scan.
pub async fn find_single_device(options: ScanOptions) -> Result<DiscoveredDevice> {
    let devices = discover(options).await?;
    exactly_one(devices)
}

fn exactly_one<T>(mut items: Vec<T>) -> Result<T> {
    match items.len() {
        0 => Err(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)),
        1 => items
            .pop()
            .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)),
        count => Err(Error::DeviceNotFound(DeviceNotFoundReason::Ambiguous {
            count,
        })),
    }
}

/// Process a peripheral and determine if it's an Aranet device.
async fn process_peripheral(
    peripheral: &Peripheral,
    filter_aranet_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let is_aranet = is_aranet_device(&properties);
    if filter_aranet_only && !is_aranet {
        return Ok(None);
    }

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredDevice {
        name: properties.local_name.clone(),
        id,
        address,
        identifier,
        rssi: properties.rssi,
        is_aranet,
        manufacturer_data: properties.manufacturer_data.get(&MANUFACTURER_ID).cloned(),
    }))
}

/// Check if a peripheral is an Aranet device based on its properties.
fn is_aranet_device(properties: &btleplug::api::PeripheralProperties) -> bool {
    if properties.manufacturer_data.contains_key(&MANUFACTURER_ID) {
        return true;
    }

    let is_aranet_service =
        |uuid: &uuid::Uuid| *uuid == SAF_TEHNIKA_SERVICE_NEW || *uuid == SAF_TEHNIKA_SERVICE_OLD;

    if properties.service_data.keys().any(is_aranet_service)
        || properties.services.iter().any(is_aranet_service)
    {
        return true;
    }

    properties
        .local_name
        .as_ref()
        .is_some_and(|name| name.to_lowercase().contains("aranet"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_options_builder() {
        let opts = ScanOptions::new().duration_secs(12).all_devices();
        assert_eq!(opts.duration, Duration::from_secs(12));
        assert!(!opts.filter_aranet_only);
        assert!(ScanOptions::default().filter_aranet_only);
    }

    #[test]
    fn test_exactly_one_device() {
        assert_eq!(exactly_one(vec!["AA:BB:CC:DD:EE:FF"]).unwrap(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_no_devices_in_range() {
        let err = exactly_one(Vec::<&str>::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)
        ));
    }

    #[test]
    fn test_several_devices_is_ambiguous() {
        let err = exactly_one(vec!["a", "b"]).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceNotFound(DeviceNotFoundReason::Ambiguous { count: 2 })
        ));
    }

    #[test]
    fn test_is_aranet_device_by_manufacturer_data() {
        let mut props = btleplug::api::PeripheralProperties::default();
        assert!(!is_aranet_device(&props));

        props.manufacturer_data.insert(MANUFACTURER_ID, vec![0x22]);
        assert!(is_aranet_device(&props));
    }

    #[test]
    fn test_is_aranet_device_by_name_or_service() {
        let mut props = btleplug::api::PeripheralProperties::default();
        props.local_name = Some("Aranet4 17C3C".to_string());
        assert!(is_aranet_device(&props));

        let mut props = btleplug::api::PeripheralProperties::default();
        props.services.push(SAF_TEHNIKA_SERVICE_NEW);
        assert!(is_aranet_device(&props));
    }
}
