//! Passive monitoring via BLE advertisements.
//!
//! [`AdvertisementListener`] keeps a BLE scan running and forwards every
//! Aranet advertisement it hears into an `mpsc` channel. It does no
//! filtering by device and no deduplication; that is the monitor's job.
//!
//! # Example
//!
//! ```ignore
//! use aranet_core::passive::{AdvertisementListener, ListenerOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let (listener, mut rx) = AdvertisementListener::new(ListenerOptions::default());
//! let handle = listener.start(cancel.clone());
//!
//! while let Some(adv) = rx.recv().await {
//!     println!("{}: {:?}", adv.device_id, adv.data.map(|d| d.co2));
//! }
//! ```

use btleplug::api::{Central, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, PeripheralId};
use futures::StreamExt;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use aranet_types::Reading;
use aranet_types::uuid::MANUFACTURER_ID;

use crate::advertisement::{AdvertisementData, parse_advertisement_with_name};
use crate::error::Result;
use crate::scan::get_adapter;
use crate::util::{create_identifier, format_peripheral_id};

/// One advertisement heard from an Aranet device.
#[derive(Debug, Clone)]
pub struct Advertisement {
    /// Device identifier (MAC address, or UUID on macOS).
    pub device_id: String,
    /// Device name if available.
    pub name: Option<String>,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Decoded sensor data; `None` when the device is not sharing readings.
    pub data: Option<AdvertisementData>,
    /// When the advertisement was received.
    pub received_at: OffsetDateTime,
}

impl Advertisement {
    /// The measurement carried by this advertisement, if any.
    pub fn reading(&self) -> Option<Result<Reading>> {
        self.data.map(|data| data.to_reading(self.received_at))
    }
}

/// Options for the advertisement listener.
#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Channel capacity for advertisements.
    pub channel_capacity: usize,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl ListenerOptions {
    /// Create new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

/// Forwards Aranet advertisements from the BLE adapter into a channel.
pub struct AdvertisementListener {
    sender: mpsc::Sender<Advertisement>,
}

impl AdvertisementListener {
    /// Create a listener and the receiving end of its channel.
    pub fn new(options: ListenerOptions) -> (Self, mpsc::Receiver<Advertisement>) {
        let (sender, receiver) = mpsc::channel(options.channel_capacity);
        (Self { sender }, receiver)
    }

    /// Start listening.
    ///
    /// This spawns a background task that scans until the cancellation
    /// token is triggered or the receiver is dropped.
    pub fn start(self, cancel_token: CancellationToken) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let adapter = get_adapter().await?;
            self.listen(&adapter, cancel_token).await
        })
    }

    /// Listen on a specific adapter until cancelled.
    pub async fn listen(&self, adapter: &Adapter, cancel_token: CancellationToken) -> Result<()> {
        let mut events = adapter.events().await?;
        adapter.start_scan(ScanFilter::default()).await?;
        info!("Listening for advertisements");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Advertisement listener cancelled");
                    break;
                }
                event = events.next() => {
                    let Some(event) = event else {
                        warn!("BLE event stream ended");
                        break;
                    };
                    let CentralEvent::ManufacturerDataAdvertisement { id, manufacturer_data } = event else {
                        continue;
                    };
                    let Some(payload) = manufacturer_data.get(&MANUFACTURER_ID) else {
                        continue;
                    };

                    let Some(advertisement) = self.describe(adapter, &id, payload).await else {
                        continue;
                    };
                    if self.sender.send(advertisement).await.is_err() {
                        debug!("Advertisement receiver dropped");
                        break;
                    }
                }
            }
        }

        if let Err(e) = adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }
        Ok(())
    }

    /// Look up the peripheral's identity and decode its payload.
    async fn describe(
        &self,
        adapter: &Adapter,
        id: &PeripheralId,
        payload: &[u8],
    ) -> Option<Advertisement> {
        let properties = match adapter.peripheral(id).await {
            Ok(peripheral) => peripheral.properties().await.ok().flatten(),
            Err(e) => {
                trace!("Unknown peripheral {:?}: {}", id, e);
                None
            }
        };

        let (device_id, name, rssi) = match properties {
            Some(props) => (
                create_identifier(&props.address.to_string(), id),
                props.local_name,
                props.rssi,
            ),
            None => (format_peripheral_id(id), None, None),
        };

        decode(
            device_id,
            name,
            rssi,
            payload,
            OffsetDateTime::now_utc(),
        )
    }
}

/// Build an [`Advertisement`] from a raw manufacturer payload.
///
/// Payloads that cannot be decoded are logged and dropped.
pub fn decode(
    device_id: String,
    name: Option<String>,
    rssi: Option<i16>,
    payload: &[u8],
    received_at: OffsetDateTime,
) -> Option<Advertisement> {
    match parse_advertisement_with_name(payload, name.as_deref()) {
        Ok(data) => Some(Advertisement {
            device_id,
            name,
            rssi,
            data,
            received_at,
        }),
        Err(e) => {
            debug!("Failed to parse advertisement from {}: {}", device_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn payload(flags: u8) -> Vec<u8> {
        let mut data = vec![flags, 0x13, 0x04, 0x01, 0x00, 0x0E, 0x0F, 0x01];
        data.extend_from_slice(&[
            0x8A, 0x02, // CO2 = 650
            0x90, 0x01, // 400 * 0.05 = 20.0 °C
            0x6C, 0x27, // 1009.2 hPa
            40, 90, 1, // humidity, battery, status
            0x3C, 0x00, // interval = 60
            0x0A, 0x00, // age = 10
            7,
        ]);
        data
    }

    #[test]
    fn test_listener_options() {
        assert_eq!(ListenerOptions::default().channel_capacity, 64);
        assert_eq!(ListenerOptions::new().channel_capacity(0).channel_capacity, 1);
    }

    #[test]
    fn test_decode_with_data() {
        let at = datetime!(2024-05-01 08:00:10 UTC);
        let adv = decode("AA:BB".into(), Some("Aranet4 1".into()), Some(-60), &payload(0x22), at)
            .unwrap();

        let reading = adv.reading().unwrap().unwrap();
        assert_eq!(reading.co2(), 650);
        assert_eq!(reading.timestamp(), datetime!(2024-05-01 08:00:00 UTC));
        assert!((reading.temperature() - 68.0).abs() < 0.01);
    }

    #[test]
    fn test_decode_without_data() {
        let at = datetime!(2024-05-01 08:00:10 UTC);
        let adv = decode("AA:BB".into(), None, None, &payload(0x02), at).unwrap();
        assert!(adv.data.is_none());
        assert!(adv.reading().is_none());
    }

    #[test]
    fn test_decode_drops_garbage() {
        let at = datetime!(2024-05-01 08:00:10 UTC);
        assert!(decode("AA:BB".into(), None, None, &[0x01, 0x02, 0x03], at).is_none());
    }

    #[tokio::test]
    async fn test_channel_closes_with_listener() {
        let (listener, mut rx) = AdvertisementListener::new(ListenerOptions::default());
        drop(listener);
        assert!(rx.recv().await.is_none());
    }
}
