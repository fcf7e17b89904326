//! Bluetooth identifiers used to recognize Aranet devices.

use uuid::{Uuid, uuid};

/// Saf Tehnika custom service UUID for firmware v1.2.0 and newer.
pub const SAF_TEHNIKA_SERVICE_NEW: Uuid = uuid!("0000fce0-0000-1000-8000-00805f9b34fb");

/// Saf Tehnika custom service UUID for firmware versions before v1.2.0.
pub const SAF_TEHNIKA_SERVICE_OLD: Uuid = uuid!("f0cd1400-95da-4f4b-9ac8-aa55d312af0c");

/// Saf Tehnika manufacturer ID for BLE advertisements.
pub const MANUFACTURER_ID: u16 = 0x0702;

// --- History characteristics ---

/// Number of records held in device memory.
pub const TOTAL_READINGS: Uuid = uuid!("f0cd2001-95da-4f4b-9ac8-aa55d312af0c");

/// Measurement interval in seconds.
pub const READ_INTERVAL: Uuid = uuid!("f0cd2002-95da-4f4b-9ac8-aa55d312af0c");

/// Seconds since the newest record was taken.
pub const SECONDS_SINCE_UPDATE: Uuid = uuid!("f0cd2004-95da-4f4b-9ac8-aa55d312af0c");

/// Page of history values, answering the last request written to [`COMMAND`].
pub const HISTORY_V2: Uuid = uuid!("f0cd2005-95da-4f4b-9ac8-aa55d312af0c");

/// Command characteristic.
pub const COMMAND: Uuid = uuid!("f0cd1402-95da-4f4b-9ac8-aa55d312af0c");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_uuids_differ() {
        assert_ne!(SAF_TEHNIKA_SERVICE_NEW, SAF_TEHNIKA_SERVICE_OLD);
        assert_eq!(
            SAF_TEHNIKA_SERVICE_NEW.to_string(),
            "0000fce0-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_history_characteristics_are_distinct() {
        let all = [TOTAL_READINGS, READ_INTERVAL, SECONDS_SINCE_UPDATE, HISTORY_V2, COMMAND];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(HISTORY_V2.to_string(), "f0cd2005-95da-4f4b-9ac8-aa55d312af0c");
    }

    #[test]
    fn test_manufacturer_id() {
        assert_eq!(MANUFACTURER_ID, 1794);
    }
}
