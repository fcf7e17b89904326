//! History download from the device.
//!
//! An Aranet4 keeps its own record of past measurements. Connecting and
//! pulling the records newer than the latest stored one fills in whatever
//! the live monitor missed while it was not running.
//!
//! # Index Convention
//!
//! **History indices are 1-based**, following the device protocol: index 1
//! is the oldest record held, index `total_readings` the newest.
//!
//! # Protocol
//!
//! Each field is downloaded separately. Writing
//! `[HISTORY_V2_REQUEST, param, start_lo, start_hi]` to the command
//! characteristic makes the next read of [`HISTORY_V2`] return a page of
//! values starting at `start`. Record timestamps are not stored on the
//! device; they are worked out from the measurement interval and the age
//! of the newest record.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use bytes::Buf;
use time::OffsetDateTime;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use aranet_store::{HistoryStore, ImportResult, import_readings};
use aranet_types::Reading;
use aranet_types::uuid::{
    COMMAND, HISTORY_V2, READ_INTERVAL, SECONDS_SINCE_UPDATE, TOTAL_READINGS,
};

use crate::advertisement::{raw_to_celsius, raw_to_hpa};
use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::scan::get_adapter;
use crate::traits::GattLink;
use crate::util::{create_identifier, same_device};

/// Command byte requesting a page of history (read-based protocol).
pub const HISTORY_V2_REQUEST: u8 = 0x61;

/// Bytes before the values in a history page.
const PAGE_HEADER_LEN: usize = 10;

/// Pages for another field tolerated before giving up on one.
const MAX_PARAM_MISMATCHES: u32 = 5;

/// Field selector of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HistoryParam {
    Temperature = 1,
    Humidity = 2,
    Pressure = 3,
    Co2 = 4,
}

impl HistoryParam {
    /// Bytes per value in a history page.
    fn value_size(self) -> usize {
        match self {
            HistoryParam::Humidity => 1,
            _ => 2,
        }
    }
}

/// Options for a history download.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// How long to scan for a device that is not already known.
    pub scan_timeout: Duration,
    /// Limit on each connect, read and write.
    pub io_timeout: Duration,
    /// Pause between a history request and reading its answer.
    pub read_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(10),
            read_delay: Duration::from_millis(50),
        }
    }
}

impl SyncOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan timeout in seconds.
    pub fn scan_timeout_secs(mut self, secs: u64) -> Self {
        self.scan_timeout = Duration::from_secs(secs);
        self
    }

    /// Set the pause between a request and its read.
    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }
}

/// What the device holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryInfo {
    /// Number of records held.
    pub total_readings: u16,
    /// Measurement interval in seconds.
    pub interval_secs: u16,
    /// Seconds since the newest record was taken.
    pub secs_since_update: u16,
}

impl HistoryInfo {
    /// When the newest record was taken.
    pub fn newest_record_at(&self, now: OffsetDateTime) -> OffsetDateTime {
        now - time::Duration::seconds(i64::from(self.secs_since_update))
    }

    /// 1-based index of the oldest record that can be newer than `latest`.
    ///
    /// One record before that point is included, so a drifting clock never
    /// costs a record. Without a latest record everything is downloaded.
    pub fn start_index_after(&self, latest: Option<OffsetDateTime>, now: OffsetDateTime) -> u16 {
        let total = i64::from(self.total_readings);
        let (Some(latest), true) = (latest, self.interval_secs > 0) else {
            return 1;
        };

        let elapsed = (self.newest_record_at(now) - latest).whole_seconds().max(0);
        let needed = (elapsed / i64::from(self.interval_secs) + 1).min(total);
        // Fits: 1 <= total - needed + 1 <= total
        (total - needed + 1).max(1) as u16
    }
}

/// One answer to a history request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryPage {
    param: u8,
    start: u16,
    values: Vec<u16>,
}

/// Decode a history page.
///
/// Layout:
/// - byte 0: param
/// - bytes 1-2: interval (u16 LE)
/// - bytes 3-4: total readings (u16 LE)
/// - bytes 5-6: seconds since update (u16 LE)
/// - bytes 7-8: index of the first value (u16 LE)
/// - byte 9: value count
/// - bytes 10+: values, 1 or 2 bytes each (LE)
fn parse_page(mut data: &[u8], value_size: usize) -> Result<HistoryPage> {
    if data.len() < PAGE_HEADER_LEN {
        return Err(Error::InvalidData(format!(
            "history page too short: {} bytes",
            data.len()
        )));
    }

    let param = data.get_u8();
    data.advance(6);
    let start = data.get_u16_le();
    let count = usize::from(data.get_u8());

    let available = data.len() / value_size;
    let values = (0..count.min(available))
        .map(|_| {
            if value_size == 1 {
                u16::from(data.get_u8())
            } else {
                data.get_u16_le()
            }
        })
        .collect();

    Ok(HistoryPage {
        param,
        start,
        values,
    })
}

async fn read_u16<L: GattLink + ?Sized>(link: &L, characteristic: Uuid, what: &str) -> Result<u16> {
    let data = link.read(characteristic).await?;
    match data.as_slice() {
        [lo, hi, ..] => Ok(u16::from_le_bytes([*lo, *hi])),
        _ => Err(Error::InvalidData(format!(
            "{}: expected 2 bytes, got {}",
            what,
            data.len()
        ))),
    }
}

/// Read how many records the device holds and how they are spaced.
pub async fn read_history_info<L: GattLink + ?Sized>(link: &L) -> Result<HistoryInfo> {
    Ok(HistoryInfo {
        total_readings: read_u16(link, TOTAL_READINGS, "total readings").await?,
        interval_secs: read_u16(link, READ_INTERVAL, "interval").await?,
        secs_since_update: read_u16(link, SECONDS_SINCE_UPDATE, "seconds since update").await?,
    })
}

/// Download one field for indices `start..=end`.
async fn download_param<L: GattLink + ?Sized>(
    link: &L,
    param: HistoryParam,
    start: u16,
    end: u16,
    read_delay: Duration,
) -> Result<Vec<u16>> {
    debug!("Downloading {:?} history from {} to {}", param, start, end);

    let mut values: BTreeMap<u16, u16> = BTreeMap::new();
    let mut next = start;
    let mut mismatches = 0;

    while next <= end {
        let [lo, hi] = next.to_le_bytes();
        link.write(COMMAND, &[HISTORY_V2_REQUEST, param as u8, lo, hi])
            .await?;
        sleep(read_delay).await;

        let page = parse_page(&link.read(HISTORY_V2).await?, param.value_size())?;
        if page.param != param as u8 {
            mismatches += 1;
            if mismatches > MAX_PARAM_MISMATCHES {
                return Err(Error::InvalidData(format!(
                    "device kept answering param {} instead of {:?}",
                    page.param, param
                )));
            }
            warn!("Unexpected parameter in history page: {}", page.param);
            continue;
        }
        if page.values.is_empty() {
            debug!("Reached end of history");
            break;
        }

        for (offset, value) in page.values.iter().enumerate() {
            let index = usize::from(page.start) + offset;
            if index > usize::from(end) {
                break;
            }
            values.insert(index as u16, *value);
        }

        let after = usize::from(page.start) + page.values.len();
        if after > usize::from(end) {
            break;
        }
        if after <= usize::from(next) {
            return Err(Error::InvalidData(format!(
                "history page at {} did not move past {}",
                page.start, next
            )));
        }
        next = after as u16;
    }

    Ok(values.into_values().collect())
}

/// Download records `start..=total` as readings.
///
/// The newest record is `info.secs_since_update` old at `now`; each earlier
/// one is a further `info.interval_secs` back.
pub async fn download_readings<L: GattLink + ?Sized>(
    link: &L,
    info: &HistoryInfo,
    start: u16,
    read_delay: Duration,
    now: OffsetDateTime,
) -> Result<Vec<Reading>> {
    let end = info.total_readings;
    if end == 0 || start > end {
        return Ok(Vec::new());
    }

    let co2 = download_param(link, HistoryParam::Co2, start, end, read_delay).await?;
    let temperature =
        download_param(link, HistoryParam::Temperature, start, end, read_delay).await?;
    let pressure = download_param(link, HistoryParam::Pressure, start, end, read_delay).await?;
    let humidity = download_param(link, HistoryParam::Humidity, start, end, read_delay).await?;

    let count = co2.len();
    if [temperature.len(), pressure.len(), humidity.len()]
        .iter()
        .any(|len| *len != count)
    {
        return Err(Error::InvalidData(format!(
            "history fields differ in length: co2 {}, temperature {}, pressure {}, humidity {}",
            count,
            temperature.len(),
            pressure.len(),
            humidity.len()
        )));
    }

    let newest = info.newest_record_at(now);
    let interval = i64::from(info.interval_secs);
    let readings = (0..count)
        .filter_map(|i| {
            let records_ago = (count - 1 - i) as i64;
            let built = Reading::builder(newest - time::Duration::seconds(records_ago * interval))
                .co2(co2[i])
                .celsius(raw_to_celsius(temperature[i]))
                .humidity(f32::from(humidity[i]))
                .pressure(raw_to_hpa(pressure[i]))
                .interval(info.interval_secs)
                .try_build();
            match built {
                Ok(reading) => Some(reading),
                Err(e) => {
                    warn!("Dropping history record {}: {}", usize::from(start) + i, e);
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    info!("Downloaded {} history records", readings.len());
    Ok(readings)
}

/// Bring `store` up to date with the records held on the device.
///
/// Only records newer than the latest stored one are requested, and the
/// batch goes through [`import_readings`], so anything within
/// [`SAME_MEASUREMENT_SECS`](aranet_store::SAME_MEASUREMENT_SECS) of
/// stored history counts as already recorded.
pub async fn sync_history<L, S>(link: &L, store: &mut S, options: &SyncOptions) -> Result<ImportResult>
where
    L: GattLink + ?Sized,
    S: HistoryStore + ?Sized,
{
    let info = read_history_info(link).await?;
    info!(
        "Device has {} records, interval {}s, last update {}s ago",
        info.total_readings, info.interval_secs, info.secs_since_update
    );
    if info.total_readings == 0 {
        return Ok(ImportResult::default());
    }

    let now = OffsetDateTime::now_utc();
    let latest = store.latest()?.map(|r| r.timestamp());
    let start = info.start_index_after(latest, now);
    let readings = download_readings(link, &info, start, options.read_delay, now).await?;

    Ok(import_readings(store, readings)?)
}

/// A connected device, ready for history requests.
pub struct DeviceLink {
    peripheral: Peripheral,
    characteristics: HashMap<Uuid, Characteristic>,
    io_timeout: Duration,
}

impl DeviceLink {
    /// Find the device named by `identifier` and connect to it.
    ///
    /// A device the adapter already knows is used directly; otherwise one
    /// scan of `options.scan_timeout` is made.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect(identifier: &str, options: &SyncOptions) -> Result<Self> {
        let adapter = get_adapter().await?;

        let peripheral = match find_known(&adapter, identifier).await? {
            Some(peripheral) => peripheral,
            None => {
                info!("Scanning {}s for device", options.scan_timeout.as_secs());
                adapter.start_scan(ScanFilter::default()).await?;
                sleep(options.scan_timeout).await;
                adapter.stop_scan().await?;
                find_known(&adapter, identifier).await?.ok_or_else(|| {
                    Error::DeviceNotFound(DeviceNotFoundReason::NotInRange {
                        identifier: identifier.to_string(),
                    })
                })?
            }
        };

        let io_timeout = options.io_timeout;
        info!("Connecting to device...");
        with_timeout(io_timeout, "connect to device", peripheral.connect()).await?;
        with_timeout(io_timeout, "discover services", peripheral.discover_services()).await?;

        let characteristics: HashMap<Uuid, Characteristic> = peripheral
            .characteristics()
            .into_iter()
            .map(|c| (c.uuid, c))
            .collect();
        debug!("Cached {} characteristics", characteristics.len());

        Ok(Self {
            peripheral,
            characteristics,
            io_timeout,
        })
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.peripheral.disconnect().await?;
        Ok(())
    }

    fn characteristic(&self, uuid: Uuid) -> Result<&Characteristic> {
        self.characteristics
            .get(&uuid)
            .ok_or(Error::CharacteristicNotFound(uuid))
    }
}

#[async_trait]
impl GattLink for DeviceLink {
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        let target = self.characteristic(characteristic)?;
        let operation = format!("read characteristic {}", characteristic);
        with_timeout(self.io_timeout, &operation, self.peripheral.read(target)).await
    }

    async fn write(&self, characteristic: Uuid, data: &[u8]) -> Result<()> {
        let target = self.characteristic(characteristic)?;
        let operation = format!("write characteristic {}", characteristic);
        with_timeout(
            self.io_timeout,
            &operation,
            self.peripheral.write(target, data, WriteType::WithResponse),
        )
        .await
    }
}

async fn with_timeout<T, F>(limit: Duration, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = btleplug::Result<T>>,
{
    let result = timeout(limit, future).await.map_err(|_| Error::Timeout {
        operation: operation.to_string(),
        duration: limit,
    })?;
    Ok(result?)
}

/// A peripheral the adapter already knows under `identifier`.
async fn find_known(adapter: &Adapter, identifier: &str) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        let Some(properties) = peripheral.properties().await? else {
            continue;
        };
        let id = create_identifier(&properties.address.to_string(), &peripheral.id());
        if same_device(&id, identifier) {
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use aranet_store::MemoryStore;
    use time::macros::datetime;

    use super::*;

    /// Answers history requests from fixed per-field values, `page_len`
    /// values at a time.
    struct FakeDevice {
        info: HistoryInfo,
        co2: Vec<u16>,
        temperature: Vec<u16>,
        pressure: Vec<u16>,
        humidity: Vec<u16>,
        page_len: usize,
        request: Mutex<Option<(u8, u16)>>,
    }

    impl FakeDevice {
        fn new(info: HistoryInfo, co2: Vec<u16>) -> Self {
            let n = co2.len();
            Self {
                info,
                co2,
                temperature: vec![440; n],
                pressure: vec![10_100; n],
                humidity: vec![41; n],
                page_len: 2,
                request: Mutex::new(None),
            }
        }

        fn values(&self, param: u8) -> &[u16] {
            match param {
                1 => &self.temperature,
                2 => &self.humidity,
                3 => &self.pressure,
                _ => &self.co2,
            }
        }

        fn page(&self) -> Vec<u8> {
            let (param, start) = self.request.lock().unwrap().unwrap();
            let values = self.values(param);
            let from = usize::from(start).saturating_sub(1).min(values.len());
            let slice = &values[from..(from + self.page_len).min(values.len())];

            let mut page = vec![param];
            page.extend(self.info.interval_secs.to_le_bytes());
            page.extend(self.info.total_readings.to_le_bytes());
            page.extend(self.info.secs_since_update.to_le_bytes());
            page.extend(start.to_le_bytes());
            page.push(slice.len() as u8);
            for value in slice {
                if param == HistoryParam::Humidity as u8 {
                    page.push(*value as u8);
                } else {
                    page.extend(value.to_le_bytes());
                }
            }
            page
        }
    }

    #[async_trait]
    impl GattLink for FakeDevice {
        async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
            let value = match characteristic {
                c if c == TOTAL_READINGS => self.info.total_readings,
                c if c == READ_INTERVAL => self.info.interval_secs,
                c if c == SECONDS_SINCE_UPDATE => self.info.secs_since_update,
                c if c == HISTORY_V2 => return Ok(self.page()),
                c => return Err(Error::CharacteristicNotFound(c)),
            };
            Ok(value.to_le_bytes().to_vec())
        }

        async fn write(&self, characteristic: Uuid, data: &[u8]) -> Result<()> {
            assert_eq!(characteristic, COMMAND);
            assert_eq!(data[0], HISTORY_V2_REQUEST);
            *self.request.lock().unwrap() = Some((data[1], u16::from_le_bytes([data[2], data[3]])));
            Ok(())
        }
    }

    fn info(total_readings: u16) -> HistoryInfo {
        HistoryInfo {
            total_readings,
            interval_secs: 300,
            secs_since_update: 10,
        }
    }

    fn options() -> SyncOptions {
        SyncOptions::default().read_delay(Duration::ZERO)
    }

    #[test]
    fn test_parse_page() {
        let data = [4, 0x2C, 0x01, 5, 0, 10, 0, 3, 0, 2, 0x20, 0x03, 0x84, 0x03];
        let page = parse_page(&data, 2).unwrap();
        assert_eq!(page.param, 4);
        assert_eq!(page.start, 3);
        assert_eq!(page.values, vec![800, 900]);
    }

    #[test]
    fn test_parse_page_count_beyond_data() {
        // Claims 5 humidity values but carries 2
        let data = [2, 0, 0, 0, 0, 0, 0, 1, 0, 5, 40, 41];
        assert_eq!(parse_page(&data, 1).unwrap().values, vec![40, 41]);
    }

    #[test]
    fn test_parse_page_too_short() {
        assert!(matches!(
            parse_page(&[4, 0, 0], 2),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_start_index_after() {
        let now = OffsetDateTime::now_utc();
        let info = info(100);
        let newest = info.newest_record_at(now);

        assert_eq!(info.start_index_after(None, now), 1);
        // Latest stored is the newest on the device
        assert_eq!(info.start_index_after(Some(newest), now), 100);
        // Two intervals behind: two new records and one before them
        let two_behind = newest - time::Duration::seconds(600);
        assert_eq!(info.start_index_after(Some(two_behind), now), 98);
        // Far behind the oldest record
        let long_ago = newest - time::Duration::days(365);
        assert_eq!(info.start_index_after(Some(long_ago), now), 1);
    }

    #[tokio::test]
    async fn test_download_readings_are_spaced_by_interval() {
        let device = FakeDevice::new(info(3), vec![700, 800, 900]);
        let now = datetime!(2024-05-01 12:00:00 UTC);

        let readings = download_readings(&device, &device.info, 1, Duration::ZERO, now)
            .await
            .unwrap();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[2].co2(), 900);
        assert_eq!(readings[2].timestamp(), now - time::Duration::seconds(10));
        assert_eq!(
            readings[0].timestamp(),
            now - time::Duration::seconds(610)
        );
        // 440 * 0.05 = 22 °C
        assert!((readings[0].temperature() - 71.6).abs() < 0.01);
        assert!((readings[0].pressure() - 1010.0).abs() < 0.01);
        assert_eq!(readings[0].humidity(), 41.0);
    }

    #[tokio::test]
    async fn test_out_of_range_record_is_dropped() {
        let mut device = FakeDevice::new(info(3), vec![700, 800, 900]);
        device.humidity = vec![41, 255, 43];
        let now = datetime!(2024-05-01 12:00:00 UTC);

        let readings = download_readings(&device, &device.info, 1, Duration::ZERO, now)
            .await
            .unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].co2(), 700);
        assert_eq!(readings[1].co2(), 900);
    }

    #[tokio::test]
    async fn test_sync_into_empty_store_takes_everything() {
        let device = FakeDevice::new(info(5), vec![500, 600, 700, 800, 900]);
        let mut store = MemoryStore::new();

        let result = sync_history(&device, &mut store, &options()).await.unwrap();

        assert_eq!(result.read, 5);
        assert_eq!(result.imported, 5);
        assert_eq!(store.latest().unwrap().unwrap().co2(), 900);
    }

    #[tokio::test]
    async fn test_sync_skips_records_within_a_minute_of_history() {
        let device = FakeDevice::new(info(5), vec![500, 600, 700, 800, 900]);
        // Device records fall at now-1210, -910, -610, -310 and -10.
        // The stored one is 30 s before the third.
        let latest = OffsetDateTime::now_utc() - time::Duration::seconds(640);
        let mut store: MemoryStore = [Reading::builder(latest)
            .co2(650)
            .fahrenheit(70.0)
            .humidity(40.0)
            .pressure(1010.0)
            .build()]
        .into_iter()
        .collect();

        let result = sync_history(&device, &mut store, &options()).await.unwrap();

        // Only records from index 3 on are requested
        assert_eq!(result.read, 3);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.imported, 2);
        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.latest().unwrap().unwrap().co2(), 900);
    }

    #[tokio::test]
    async fn test_sync_empty_device() {
        let device = FakeDevice::new(info(0), Vec::new());
        let mut store = MemoryStore::new();

        let result = sync_history(&device, &mut store, &options()).await.unwrap();
        assert_eq!(result, ImportResult::default());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_param_is_retried_then_rejected() {
        struct Confused;

        #[async_trait]
        impl GattLink for Confused {
            async fn read(&self, _: Uuid) -> Result<Vec<u8>> {
                Ok(vec![9, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0, 0])
            }

            async fn write(&self, _: Uuid, _: &[u8]) -> Result<()> {
                Ok(())
            }
        }

        let result = download_param(&Confused, HistoryParam::Co2, 1, 1, Duration::ZERO).await;
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }
}
