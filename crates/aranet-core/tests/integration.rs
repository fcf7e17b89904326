//! Integration tests for aranet-core
//!
//! These tests require actual BLE hardware and should be run with:
//! `cargo test --package aranet-core -- --ignored --nocapture`
//!
//! Set the ARANET_MAC environment variable to specify which device to test.
//! If not set, the tests use the only Aranet device in range.

use std::env;
use std::time::Duration;

use aranet_core::passive::{AdvertisementListener, ListenerOptions};
use aranet_core::scan::{self, ScanOptions};
use aranet_core::same_device;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Default timeout for BLE operations.
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the device identifier from the environment, or scan for one.
async fn device_identifier() -> String {
    if let Ok(mac) = env::var("ARANET_MAC") {
        return mac;
    }
    let options = ScanOptions::default().duration_secs(10);
    match timeout(BLE_TIMEOUT, scan::find_single_device(options)).await {
        Ok(Ok(device)) => device.identifier,
        Ok(Err(e)) => panic!("No single device to test with: {}", e),
        Err(_) => panic!("Scan timed out after {:?}", BLE_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_for_devices() {
    // Use 15-second scan to catch devices with long advertisement intervals
    let options = ScanOptions::default().duration_secs(15);

    let result = timeout(BLE_TIMEOUT, scan::discover(options)).await;

    match result {
        Ok(Ok(devices)) => {
            println!("Found {} devices", devices.len());
            for device in devices {
                println!(
                    "  {} ({})",
                    device.name.as_deref().unwrap_or("Unknown"),
                    device.identifier
                );
                assert!(device.is_aranet);
            }
        }
        Ok(Err(e)) => panic!("Scan failed: {}", e),
        Err(_) => panic!("Scan timed out after {:?}", BLE_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware and Smart Home integration enabled"]
async fn test_listen_for_readings() {
    let device = device_identifier().await;
    println!("Listening for {}", device);

    let cancel = CancellationToken::new();
    let (listener, mut events) = AdvertisementListener::new(ListenerOptions::default());
    let handle = listener.start(cancel.clone());

    let heard = timeout(BLE_TIMEOUT, async {
        while let Some(advertisement) = events.recv().await {
            if !same_device(&advertisement.device_id, &device) {
                continue;
            }
            if let Some(reading) = advertisement.reading() {
                return Some(reading);
            }
        }
        None
    })
    .await;

    cancel.cancel();
    let reading = match heard {
        Ok(Some(Ok(reading))) => reading,
        Ok(Some(Err(e))) => panic!("Undecodable reading: {}", e),
        Ok(None) => panic!("Listener stopped before hearing {}", device),
        Err(_) => panic!("No reading within {:?}", BLE_TIMEOUT),
    };

    println!(
        "CO2 {} ppm, {:.1} °F, {:.0}%, {:.1} hPa",
        reading.co2(),
        reading.temperature(),
        reading.humidity(),
        reading.pressure()
    );
    assert!(reading.co2() > 0);
    assert!(reading.interval().is_some());

    let stopped = timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))));
}
